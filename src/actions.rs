use std::fmt;

/// Identifier of a question or answer as rendered into the page.
/// Passed through into url paths untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Question,
    Answer,
}

impl EntityKind {
    fn segment(self) -> &'static str {
        match self {
            EntityKind::Question => "question",
            EntityKind::Answer => "answer",
        }
    }
}

/// The entity an action touches; at most one action per target runs at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.segment(), self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    /// Value of the `like` parameter.
    pub fn signal(self) -> i8 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

impl From<bool> for Vote {
    fn from(is_up: bool) -> Self {
        if is_up {
            Vote::Up
        } else {
            Vote::Down
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QaAction {
    StarAnswer(EntityId),
    UnstarAnswer(EntityId),
    CancelVoteQuestion(EntityId),
    CancelVoteAnswer(EntityId),
    VoteQuestion(EntityId, Vote),
    VoteAnswer(EntityId, Vote),
}

impl QaAction {
    pub fn target(&self) -> Target {
        let (kind, id) = match self {
            QaAction::CancelVoteQuestion(id) | QaAction::VoteQuestion(id, _) => (EntityKind::Question, id),
            QaAction::StarAnswer(id)
            | QaAction::UnstarAnswer(id)
            | QaAction::CancelVoteAnswer(id)
            | QaAction::VoteAnswer(id, _) => (EntityKind::Answer, id),
        };
        Target { kind, id: id.clone() }
    }

    fn verb(&self) -> &'static str {
        match self {
            QaAction::StarAnswer(_) => "star",
            QaAction::UnstarAnswer(_) => "unstar",
            QaAction::CancelVoteQuestion(_) | QaAction::CancelVoteAnswer(_) => "unvote",
            QaAction::VoteQuestion(..) | QaAction::VoteAnswer(..) => "vote",
        }
    }

    /// Direction for vote actions, `None` for everything else.
    pub fn vote(&self) -> Option<Vote> {
        match self {
            QaAction::VoteQuestion(_, vote) | QaAction::VoteAnswer(_, vote) => Some(*vote),
            _ => None,
        }
    }

    /// Endpoint path, e.g. `/qa/answer/42/star`.
    pub fn path(&self) -> String {
        format!("/qa/{}/{}", self.target(), self.verb())
    }
}

impl fmt::Display for QaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vote() {
            Some(vote) => write!(f, "{} {} ({:+})", self.verb(), self.target(), vote.signal()),
            None => write!(f, "{} {}", self.verb(), self.target()),
        }
    }
}
