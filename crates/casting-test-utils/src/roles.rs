//! Role fixtures matching the identity provider's configured roles.

/// Casting agency roles, each a superset of the one before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Can view actors and movies.
    CastingAssistant,
    /// Assistant, plus add/delete actors and modify actors and movies.
    CastingDirector,
    /// Director, plus add/delete movies.
    ExecutiveProducer,
}

const ASSISTANT: &[&str] = &["get:movies", "get:actors"];

const DIRECTOR: &[&str] = &[
    "get:movies",
    "get:actors",
    "create:actors",
    "delete:actors",
    "update:actors",
    "update:movies",
];

const PRODUCER: &[&str] = &[
    "get:movies",
    "get:actors",
    "create:actors",
    "delete:actors",
    "update:actors",
    "update:movies",
    "create:movies",
    "delete:movies",
];

impl Role {
    pub const ALL: [Role; 3] = [
        Role::CastingAssistant,
        Role::CastingDirector,
        Role::ExecutiveProducer,
    ];

    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Role::CastingAssistant => ASSISTANT,
            Role::CastingDirector => DIRECTOR,
            Role::ExecutiveProducer => PRODUCER,
        }
    }

    pub fn has(self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }

    /// Stable subject for tokens issued to this role.
    pub fn subject(self) -> &'static str {
        match self {
            Role::CastingAssistant => "auth0|casting-assistant",
            Role::CastingDirector => "auth0|casting-director",
            Role::ExecutiveProducer => "auth0|executive-producer",
        }
    }
}
