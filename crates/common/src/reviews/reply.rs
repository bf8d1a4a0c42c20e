//! Reply annotations
//!
//! Every reply is stored as `replied_to:<name>|<text>` under the root review,
//! where `<name>` is the author it answers. Older replies carry no annotation;
//! for those the target is inferred from reply order. A `null` name marks a
//! reply that answers nobody in particular.

use super::VoteKey;
use crate::db::models::Review;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const REPLY_PREFIX: &str = "replied_to:";
const NO_TARGET: &str = "null";

static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").expect("mention regex"));

/// Encode a reply addressed to `target`
pub fn encode_reply(target: &str, text: &str) -> String {
    format!("{}{}|{}", REPLY_PREFIX, target.trim(), text)
}

/// A reply body split into its target and text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReply<'a> {
    pub target: Option<&'a str>,
    pub body: &'a str,
    /// Annotated with `null`: the reply answers nobody and no target is inferred
    pub untargeted: bool,
}

/// Where a new reply is filed and the comment it is stored with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPlacement {
    /// Key of the root review the reply hangs under
    pub parent: VoteKey,
    pub comment: String,
}

/// Place a reply answering `target`, which may be a root review or another reply.
///
/// The reply always goes under the thread root and names `target`'s author.
pub fn place_reply(target: &Review, text: &str) -> ReplyPlacement {
    ReplyPlacement {
        parent: VoteKey::thread_root(target),
        comment: encode_reply(&target.user_name, text),
    }
}

/// Split an annotated reply. Unannotated comments come back whole with no target.
pub fn parse_reply(comment: &str) -> ParsedReply<'_> {
    let plain = ParsedReply {
        target: None,
        body: comment,
        untargeted: false,
    };
    let Some(rest) = comment.strip_prefix(REPLY_PREFIX) else {
        return plain;
    };
    let Some((target, body)) = rest.split_once('|') else {
        return plain;
    };

    let target = target.trim();
    ParsedReply {
        target: (!target.is_empty() && target != NO_TARGET).then_some(target),
        body,
        untargeted: target == NO_TARGET,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSource {
    /// Taken from the reply annotation
    Explicit,
    /// Guessed from reply order
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub name: String,
    pub source: TargetSource,
    /// The reply answers its own author
    pub is_self: bool,
}

/// Work out who `reply` answers within the thread rooted at `root`.
///
/// The inferred case is best effort and can misattribute.
pub fn resolve_target(reply: &Review, root: &Review, replies: &[Review]) -> Option<ReplyTarget> {
    let parsed = parse_reply(&reply.comment);
    if let Some(name) = parsed.target {
        return Some(ReplyTarget {
            name: name.to_string(),
            source: TargetSource::Explicit,
            is_self: name == reply.user_name,
        });
    }

    if parsed.untargeted || replies.len() <= 1 {
        return None;
    }

    let mut chronological: Vec<&Review> = replies.iter().collect();
    chronological.sort_by_key(|r| r.created_at);
    let position = chronological.iter().position(|r| r.id == reply.id)?;

    let candidate = if position > 0 {
        &chronological[position - 1].user_name
    } else {
        &root.user_name
    };

    (candidate != &reply.user_name).then(|| ReplyTarget {
        name: candidate.clone(),
        source: TargetSource::Inferred,
        is_self: false,
    })
}

/// All `@name` mentions in `text`, without the `@`
pub fn mentions(text: &str) -> Vec<&str> {
    MENTION
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::thread::tests::{reply_to, root};

    #[test]
    fn test_encode_and_parse() {
        let encoded = encode_reply(" Alice ", "thanks!");
        assert_eq!(encoded, "replied_to:Alice|thanks!");

        let parsed = parse_reply(&encoded);
        assert_eq!(parsed.target, Some("Alice"));
        assert_eq!(parsed.body, "thanks!");
    }

    #[test]
    fn test_parse_keeps_later_pipes() {
        let parsed = parse_reply("replied_to: Bob |a | b | c");
        assert_eq!(parsed.target, Some("Bob"));
        assert_eq!(parsed.body, "a | b | c");
    }

    #[test]
    fn test_parse_null_target() {
        let parsed = parse_reply("replied_to:null|hello");
        assert_eq!(parsed.target, None);
        assert_eq!(parsed.body, "hello");
        assert!(parsed.untargeted);

        let blank = parse_reply("replied_to:|hello");
        assert_eq!(blank.target, None);
        assert!(!blank.untargeted);
    }

    #[test]
    fn test_parse_plain_comment() {
        let parsed = parse_reply("just a reply");
        assert_eq!(
            parsed,
            ParsedReply {
                target: None,
                body: "just a reply",
                untargeted: false
            }
        );

        let no_pipe = parse_reply("replied_to:Alice without separator");
        assert_eq!(no_pipe.target, None);
        assert_eq!(no_pipe.body, "replied_to:Alice without separator");
    }

    #[test]
    fn test_explicit_target_wins() {
        let r = root("Alice", 0, None);
        let mut reply = reply_to(&r, "Bob", 1);
        reply.comment = encode_reply("Carol", "hi");

        let target = resolve_target(&reply, &r, std::slice::from_ref(&reply)).unwrap();
        assert_eq!(target.name, "Carol");
        assert_eq!(target.source, TargetSource::Explicit);
        assert!(!target.is_self);
    }

    #[test]
    fn test_explicit_self_reply() {
        let r = root("Alice", 0, None);
        let mut reply = reply_to(&r, "Bob", 1);
        reply.comment = encode_reply("Bob", "adding more");

        let target = resolve_target(&reply, &r, std::slice::from_ref(&reply)).unwrap();
        assert!(target.is_self);
    }

    #[test]
    fn test_single_unannotated_reply_has_no_target() {
        let r = root("Alice", 0, None);
        let reply = reply_to(&r, "Bob", 1);
        assert_eq!(resolve_target(&reply, &r, std::slice::from_ref(&reply)), None);
    }

    #[test]
    fn test_inferred_targets() {
        let r = root("Alice", 0, None);
        let first = reply_to(&r, "Bob", 1);
        let second = reply_to(&r, "Carol", 2);
        let third = reply_to(&r, "Carol", 3);
        // newest first, as the thread is displayed
        let replies = vec![third.clone(), second.clone(), first.clone()];

        let t1 = resolve_target(&first, &r, &replies).unwrap();
        assert_eq!(t1.name, "Alice");
        assert_eq!(t1.source, TargetSource::Inferred);

        let t2 = resolve_target(&second, &r, &replies).unwrap();
        assert_eq!(t2.name, "Bob");

        // same author as the previous reply
        assert_eq!(resolve_target(&third, &r, &replies), None);
    }

    #[test]
    fn test_null_annotation_is_not_inferred() {
        let r = root("Alice", 0, None);
        let first = reply_to(&r, "Bob", 1);
        let mut second = reply_to(&r, "Carol", 2);
        second.comment = "replied_to:null|general remark".into();
        let replies = vec![second.clone(), first];

        assert_eq!(resolve_target(&second, &r, &replies), None);
    }

    #[test]
    fn test_blank_annotation_still_infers() {
        let r = root("Alice", 0, None);
        let first = reply_to(&r, "Bob", 1);
        let mut second = reply_to(&r, "Carol", 2);
        second.comment = "replied_to:|hm".into();
        let replies = vec![second.clone(), first];

        let target = resolve_target(&second, &r, &replies).unwrap();
        assert_eq!(target.name, "Bob");
        assert_eq!(target.source, TargetSource::Inferred);
    }

    #[test]
    fn test_reply_to_root_names_root_author() {
        let r = root("Alice", 0, Some("CSE110"));
        let placed = place_reply(&r, "Agreed");

        assert_eq!(placed.comment, "replied_to:Alice|Agreed");
        assert_eq!(placed.parent, VoteKey::for_review(&r));
        assert_eq!(placed.parent.course_code.as_deref(), Some("CSE110"));
    }

    #[test]
    fn test_reply_to_reply_files_under_root_with_course() {
        let r = root("Alice", 0, Some("CSE110"));
        let bob = reply_to(&r, "Bob", 1);
        let placed = place_reply(&bob, "Not really");

        assert_eq!(placed.comment, "replied_to:Bob|Not really");
        assert_eq!(placed.parent.faculty_initial, r.faculty_initial);
        assert_eq!(placed.parent.created_at, r.created_at);
        assert_eq!(placed.parent.course_code.as_deref(), Some("CSE110"));
    }

    #[test]
    fn test_first_reply_by_root_author_has_no_target() {
        let r = root("Alice", 0, None);
        let first = reply_to(&r, "Alice", 1);
        let second = reply_to(&r, "Bob", 2);
        let replies = vec![first.clone(), second];
        assert_eq!(resolve_target(&first, &r, &replies), None);
    }

    #[test]
    fn test_mentions() {
        assert_eq!(mentions("thanks @alice and @bob_2!"), vec!["alice", "bob_2"]);
        assert!(mentions("no mentions here, mail a@ b").is_empty());
    }
}
