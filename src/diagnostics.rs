//! Analysis diagnostics.
//!
//! Every kind is blocking: a type with any diagnostic cannot receive a
//! generated formatter, so it resolves to `Unresolved` and stays out of the
//! resolver table.
use std::fmt;

use serde::Serialize;

use crate::identity::TypeIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DiagnosticKind {
    TypeMustBeMessagePackObject,
    MessageFormatterMustBeMessagePackFormatter,
    PublicMemberNeedsKey,
    BaseTypeContainsUnattributedPublicMembers,
    InvalidMessagePackObject,
    BothStringAndIntKeyAreNull,
    ConflictingFormatterOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    /// Positional `{0}`, `{1}`... placeholders filled from [`Diagnostic::args`].
    pub message_format: &'static str,
    pub severity: Severity,
}

const DESCRIPTORS: &[(DiagnosticKind, DiagnosticDescriptor)] = &[
    (
        DiagnosticKind::TypeMustBeMessagePackObject,
        DiagnosticDescriptor {
            id: "MsgPack003",
            title: "Use MessagePackObjectAttribute",
            message_format: "Type must be marked with MessagePackObjectAttribute: {0}",
            severity: Severity::Error,
        },
    ),
    (
        DiagnosticKind::PublicMemberNeedsKey,
        DiagnosticDescriptor {
            id: "MsgPack004",
            title: "Attribute public members of MessagePack objects",
            message_format: "Public members of MessagePackObject-attributed types require either KeyAttribute or IgnoreMemberAttribute: {0}.{1}",
            severity: Severity::Error,
        },
    ),
    (
        DiagnosticKind::BaseTypeContainsUnattributedPublicMembers,
        DiagnosticDescriptor {
            id: "MsgPack004",
            title: "Attribute public members of MessagePack objects",
            message_format: "Public members of base types of MessagePackObject-attributed types require either KeyAttribute or IgnoreMemberAttribute: {0}.{1}",
            severity: Severity::Error,
        },
    ),
    (
        DiagnosticKind::InvalidMessagePackObject,
        DiagnosticDescriptor {
            id: "MsgPack005",
            title: "MessagePackObject validation",
            message_format: "Invalid MessagePackObject definition: {0}",
            severity: Severity::Error,
        },
    ),
    (
        DiagnosticKind::BothStringAndIntKeyAreNull,
        DiagnosticDescriptor {
            id: "MsgPack005",
            title: "Attribute public members of MessagePack objects",
            message_format: "Both int and string keys are null: {0}.{1}",
            severity: Severity::Error,
        },
    ),
    (
        DiagnosticKind::MessageFormatterMustBeMessagePackFormatter,
        DiagnosticDescriptor {
            id: "MsgPack006",
            title: "Must be IMessageFormatter",
            message_format: "Type must be of IMessagePackFormatter: {0}",
            severity: Severity::Error,
        },
    ),
    (
        DiagnosticKind::ConflictingFormatterOverride,
        DiagnosticDescriptor {
            id: "MsgPack006",
            title: "Conflicting formatter overrides",
            message_format: "Member formatter {2} conflicts with formatter {3} declared on its type: {0}.{1}",
            severity: Severity::Error,
        },
    ),
];

impl DiagnosticKind {
    pub fn descriptor(self) -> &'static DiagnosticDescriptor {
        DESCRIPTORS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, descriptor)| descriptor)
            .unwrap_or_else(|| unreachable!("every diagnostic kind has a descriptor"))
    }

    pub fn id(self) -> &'static str {
        self.descriptor().id
    }
}

/// One reported problem. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: TypeIdentity,
    pub member: Option<String>,
    pub args: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: &TypeIdentity, member: Option<&str>, args: Vec<String>) -> Self {
        Self {
            kind,
            subject: subject.clone(),
            member: member.map(str::to_string),
            args,
        }
    }

    pub fn message(&self) -> String {
        let mut out = self.kind.descriptor().message_format.to_string();
        for (i, arg) in self.args.iter().enumerate() {
            out = out.replace(&format!("{{{i}}}"), arg);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.kind.id(), self.message())
    }
}

#[derive(Serialize)]
struct DiagnosticRecord<'a> {
    id: &'static str,
    kind: DiagnosticKind,
    severity: Severity,
    subject: &'a TypeIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    member: Option<&'a str>,
    message: String,
}

impl Serialize for Diagnostic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DiagnosticRecord {
            id: self.kind.id(),
            kind: self.kind,
            severity: self.kind.descriptor().severity,
            subject: &self.subject,
            member: self.member.as_deref(),
            message: self.message(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_fill_positional_arguments() {
        let d = Diagnostic::new(
            DiagnosticKind::PublicMemberNeedsKey,
            &TypeIdentity::named("App.Person"),
            Some("Name"),
            vec!["App.Person".into(), "Name".into()],
        );
        assert_eq!(
            d.to_string(),
            "error[MsgPack004]: Public members of MessagePackObject-attributed types require either KeyAttribute or IgnoreMemberAttribute: App.Person.Name"
        );
    }

    #[test]
    fn every_kind_has_one_descriptor() {
        for kind in [
            DiagnosticKind::TypeMustBeMessagePackObject,
            DiagnosticKind::MessageFormatterMustBeMessagePackFormatter,
            DiagnosticKind::PublicMemberNeedsKey,
            DiagnosticKind::BaseTypeContainsUnattributedPublicMembers,
            DiagnosticKind::InvalidMessagePackObject,
            DiagnosticKind::BothStringAndIntKeyAreNull,
            DiagnosticKind::ConflictingFormatterOverride,
        ] {
            assert_eq!(DESCRIPTORS.iter().filter(|(k, _)| *k == kind).count(), 1);
            assert_eq!(kind.descriptor().severity, Severity::Error);
        }
    }

    #[test]
    fn serialized_form_carries_id_and_rendered_message() {
        let d = Diagnostic::new(
            DiagnosticKind::InvalidMessagePackObject,
            &TypeIdentity::named("App.Dup"),
            None,
            vec!["key 0 is used by A, B".into()],
        );
        assert_eq!(
            serde_json::to_value(&d).unwrap(),
            serde_json::json!({
                "id": "MsgPack005",
                "kind": "InvalidMessagePackObject",
                "severity": "error",
                "subject": "App.Dup",
                "message": "Invalid MessagePackObject definition: key 0 is used by A, B",
            })
        );
    }
}
