//! Closed vocabularies used by tickets, and the actor behind each change.
//!
//! Every enum serializes to the exact Portuguese label the board and the
//! intake wizard display, so the wire format stays stable for clients.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, default = $default:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire label for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            fn expected() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| ValidationError::UnknownValue {
                        field: $field,
                        value: s.to_string(),
                        expected: Self::expected(),
                    })
            }
        }
    };
}

labeled_enum! {
    /// Workflow stage of a ticket on the board. Declaration order is the
    /// left-to-right column order.
    Status, "status", default = ChamadosAbertos {
        ChamadosAbertos => "Chamados abertos",
        EmAtendimento => "Em atendimento",
        AguardandoPublicacao => "Aguardando publicação",
        Finalizados => "Finalizados",
    }
}

labeled_enum! {
    Prioridade, "prioridade", default = Media {
        Baixa => "Baixa",
        Media => "Média",
        Alta => "Alta",
        Urgente => "Urgente",
    }
}

labeled_enum! {
    /// Intake category. The intake flow always files `Melhoria`; the other
    /// categories are reachable through the generic patch.
    Categoria, "categoria", default = Melhoria {
        Iniciativa => "Iniciativa",
        Chamado => "Chamado",
        Bug => "Bug",
        Melhoria => "Melhoria",
        Projeto => "Projeto",
    }
}

labeled_enum! {
    /// How often the reported problem happens.
    Frequencia, "frequencia", default = Pontualmente {
        Pontualmente => "Pontualmente",
        AsVezes => "Às vezes",
        QuaseSempre => "Quase sempre",
        Frequentemente => "Frequentemente",
    }
}

impl Status {
    /// Whether this stage is the terminal one that starts the archival clock.
    pub fn is_final(self) -> bool {
        self == Status::Finalizados
    }
}

/// Who is responsible for a change.
///
/// There is no authentication context: callers name themselves with free
/// text, and anything unnamed is attributed to the system actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Actor {
    /// System-initiated or anonymous change, recorded as `"Sistema"`.
    #[default]
    System,
    /// A caller-supplied identity.
    Named(String),
}

impl Actor {
    /// Name recorded for system-initiated changes.
    pub const SYSTEM_NAME: &'static str = "Sistema";

    /// Resolve an optional `author` field from a request body.
    ///
    /// Absent and blank authors fall back to [`Actor::System`].
    pub fn from_author(author: Option<String>) -> Self {
        match author {
            Some(name) if !name.trim().is_empty() => Actor::Named(name),
            _ => Actor::System,
        }
    }

    /// The name written into history entries.
    pub fn name(&self) -> &str {
        match self {
            Actor::System => Self::SYSTEM_NAME,
            Actor::Named(name) => name,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Actor {
    fn from(name: &str) -> Self {
        Actor::from_author(Some(name.to_string()))
    }
}
