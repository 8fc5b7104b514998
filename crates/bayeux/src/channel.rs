use pubsub_core::{Key, NodeName};

/// Splits a Bayeux channel such as `/foo/bar` into positional segments and
/// builds the equivalent node name `{p1: "foo", p2: "bar"}`.
///
/// Channels starting with `/meta/` are protocol channels, never node names;
/// callers are expected to have dispatched those separately.
#[must_use]
pub fn node_name_from_channel(channel: &str) -> NodeName {
    let keys = channel
        .split('/')
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(index, segment)| Key::new(format!("p{}", index + 1), segment))
        .collect();

    NodeName::from_keys(keys)
}

/// The inverse of [`node_name_from_channel`]: renders a node name's values
/// back into a slash-delimited channel, in positional order.
///
/// `NodeName` stores its keys sorted lexicographically by domain name, which
/// places `p10` before `p2`; channel-derived names number their domains
/// `p1..pn` positionally, so segments are reordered here by that numeric
/// suffix rather than by the node name's own (string) key order.
#[must_use]
pub fn channel_from_node_name(name: &NodeName) -> String {
    let mut keys: Vec<_> = name.keys().iter().collect();
    keys.sort_by_key(|key| key.domain().name()[1..].parse::<u32>().unwrap_or(0));

    let mut channel = String::new();
    for key in keys {
        channel.push('/');
        channel.push_str(key.value());
    }
    channel
}

/// A channel a client can subscribe to is never empty and never a `/meta/*`
/// protocol channel.
#[must_use]
pub fn is_subscribable_channel(channel: &str) -> bool {
    !channel.is_empty() && channel != "/" && !channel.starts_with("/meta/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trips_through_node_name_for_short_channels() {
        let channel = "/foo/bar/baz";
        let name = node_name_from_channel(channel);

        assert_eq!(channel_from_node_name(&name), channel);
    }

    #[test]
    fn single_segment_channel_round_trips() {
        let name = node_name_from_channel("/widgets");
        assert_eq!(channel_from_node_name(&name), "/widgets");
    }

    #[test]
    fn channel_with_ten_or_more_segments_round_trips_in_order() {
        let channel = "/s1/s2/s3/s4/s5/s6/s7/s8/s9/s10/s11";
        let name = node_name_from_channel(channel);

        assert_eq!(channel_from_node_name(&name), channel);
    }

    #[test]
    fn meta_channels_are_not_subscribable() {
        assert!(!is_subscribable_channel("/meta/connect"));
        assert!(!is_subscribable_channel(""));
        assert!(is_subscribable_channel("/foo/bar"));
    }
}
