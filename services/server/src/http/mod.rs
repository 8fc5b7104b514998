pub mod bayeux;
pub mod poll;
