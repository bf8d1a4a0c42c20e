//! Vote toggling
//!
//! A voter holds at most one vote per review. Voting again with the same type
//! retracts it; voting with the other type switches it.

use crate::db::models::Review;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Upvote => "upvote",
            VoteType::Downvote => "downvote",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(VoteType::Upvote),
            "downvote" => Ok(VoteType::Downvote),
            other => Err(format!("unknown vote type: {}", other)),
        }
    }
}

/// Key that vote rows use to reference a review
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteKey {
    pub faculty_initial: String,
    pub created_at: DateTimeWithTimeZone,
    pub course_code: Option<String>,
}

impl VoteKey {
    /// Replies are always keyed with a NULL course code
    pub fn for_review(review: &Review) -> Self {
        Self {
            faculty_initial: review.faculty_initial.clone(),
            created_at: review.created_at,
            course_code: if review.is_reply() {
                None
            } else {
                review.course_code.clone()
            },
        }
    }

    /// Key of the root review that `review` belongs to: the parent key of a
    /// reply, the review's own key otherwise
    pub fn thread_root(review: &Review) -> Self {
        match review
            .parent_faculty_initial
            .clone()
            .zip(review.parent_created_at)
        {
            Some((faculty_initial, created_at)) => Self {
                faculty_initial,
                created_at,
                course_code: review.parent_course_code.clone(),
            },
            None => Self::for_review(review),
        }
    }
}

/// What a vote request does to the stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No prior vote: insert and increment
    Cast(VoteType),
    /// Same vote again: delete and decrement
    Retract(VoteType),
    /// Opposite vote: move one unit from `from` to `to`
    Switch { from: VoteType, to: VoteType },
}

impl VoteTransition {
    pub fn kind(&self) -> &'static str {
        match self {
            VoteTransition::Cast(_) => "cast",
            VoteTransition::Retract(_) => "retract",
            VoteTransition::Switch { .. } => "switch",
        }
    }

    /// The voter's vote once the transition is applied
    pub fn resulting_vote(&self) -> Option<VoteType> {
        match self {
            VoteTransition::Cast(vote) => Some(*vote),
            VoteTransition::Retract(_) => None,
            VoteTransition::Switch { to, .. } => Some(*to),
        }
    }

    /// Vote row that must be removed, if any
    pub fn removed(&self) -> Option<VoteType> {
        match self {
            VoteTransition::Cast(_) => None,
            VoteTransition::Retract(vote) => Some(*vote),
            VoteTransition::Switch { from, .. } => Some(*from),
        }
    }
}

pub fn plan_vote(existing: Option<VoteType>, requested: VoteType) -> VoteTransition {
    match existing {
        None => VoteTransition::Cast(requested),
        Some(current) if current == requested => VoteTransition::Retract(requested),
        Some(current) => VoteTransition::Switch {
            from: current,
            to: requested,
        },
    }
}

/// Upvote and downvote counters of one review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub upvotes: i32,
    pub downvotes: i32,
}

impl VoteCounts {
    pub fn of(review: &Review) -> Self {
        Self {
            upvotes: review.upvotes,
            downvotes: review.downvotes,
        }
    }

    /// Counters after `transition`; never below zero
    pub fn apply(self, transition: VoteTransition) -> Self {
        let mut next = self;
        if let Some(removed) = transition.removed() {
            *next.counter_mut(removed) = (next.counter(removed) - 1).max(0);
        }
        if let Some(added) = transition.resulting_vote() {
            *next.counter_mut(added) = next.counter(added) + 1;
        }
        next
    }

    fn counter(&self, vote: VoteType) -> i32 {
        match vote {
            VoteType::Upvote => self.upvotes,
            VoteType::Downvote => self.downvotes,
        }
    }

    fn counter_mut(&mut self, vote: VoteType) -> &mut i32 {
        match vote {
            VoteType::Upvote => &mut self.upvotes,
            VoteType::Downvote => &mut self.downvotes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::thread::tests::{reply_to, root};

    #[test]
    fn test_plan_vote() {
        assert_eq!(plan_vote(None, VoteType::Upvote), VoteTransition::Cast(VoteType::Upvote));
        assert_eq!(
            plan_vote(Some(VoteType::Upvote), VoteType::Upvote),
            VoteTransition::Retract(VoteType::Upvote)
        );
        assert_eq!(
            plan_vote(Some(VoteType::Upvote), VoteType::Downvote),
            VoteTransition::Switch {
                from: VoteType::Upvote,
                to: VoteType::Downvote
            }
        );
    }

    #[test]
    fn test_toggle_twice_restores_counts() {
        let start = VoteCounts { upvotes: 4, downvotes: 1 };

        let first = plan_vote(None, VoteType::Upvote);
        let after_first = start.apply(first);
        assert_eq!(after_first.upvotes, 5);

        let second = plan_vote(first.resulting_vote(), VoteType::Upvote);
        let after_second = after_first.apply(second);
        assert_eq!(after_second, start);
        assert_eq!(second.resulting_vote(), None);
    }

    #[test]
    fn test_switch_moves_one_unit() {
        let start = VoteCounts { upvotes: 2, downvotes: 2 };
        let next = start.apply(plan_vote(Some(VoteType::Downvote), VoteType::Upvote));
        assert_eq!(next, VoteCounts { upvotes: 3, downvotes: 1 });
    }

    #[test]
    fn test_counters_never_negative() {
        let start = VoteCounts { upvotes: 0, downvotes: 0 };
        let next = start.apply(VoteTransition::Retract(VoteType::Downvote));
        assert_eq!(next, start);

        let switched = start.apply(VoteTransition::Switch {
            from: VoteType::Upvote,
            to: VoteType::Downvote,
        });
        assert_eq!(switched, VoteCounts { upvotes: 0, downvotes: 1 });
    }

    #[test]
    fn test_vote_key_for_reply_drops_course() {
        let parent = root("Alice", 10, Some("CSE110"));
        let mut reply = reply_to(&parent, "Bob", 11);
        reply.course_code = Some("CSE110".into());

        assert_eq!(VoteKey::for_review(&parent).course_code, Some("CSE110".into()));
        assert_eq!(VoteKey::for_review(&reply).course_code, None);
        assert_eq!(VoteKey::for_review(&reply).created_at, reply.created_at);
    }

    #[test]
    fn test_vote_type_parse() {
        assert_eq!("downvote".parse::<VoteType>().unwrap(), VoteType::Downvote);
        assert!("meh".parse::<VoteType>().is_err());
        assert_eq!(VoteType::Upvote.to_string(), "upvote");
    }
}
