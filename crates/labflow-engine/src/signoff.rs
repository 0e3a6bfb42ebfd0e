//! Sign-off transitions
//!
//! Sections and protocols share one sign-off lifecycle:
//!
//! ```text
//!   open ──sign──▶ signed ──witness──▶ signed + witnessed
//!    ▲               │ ▲                    │
//!    └────unsign─────┘ └─────unwitness──────┘
//! ```
//!
//! `unsign` clears the witness too; a witness only ever attests an existing
//! signature.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use labflow_model::{Protocol, Section};

/// Mutable view of a document's sign-off fields
pub struct SignoffFields<'a> {
    pub signature: &'a mut Option<String>,
    pub witness: &'a mut Option<String>,
    pub signed_on: &'a mut Option<DateTime<Utc>>,
    pub witnessed_on: &'a mut Option<DateTime<Utc>>,
}

/// A document that can be signed and witnessed
pub trait Signable {
    /// Name used in errors and logs
    fn label(&self) -> &str;

    /// Whether this document takes sign-offs at all
    fn accepts_signoff(&self) -> bool {
        true
    }

    /// Sign-off fields
    fn signoff_fields(&mut self) -> SignoffFields<'_>;
}

impl Signable for Section {
    fn label(&self) -> &str {
        self.id()
    }

    fn accepts_signoff(&self) -> bool {
        self.definition.is_signable()
    }

    fn signoff_fields(&mut self) -> SignoffFields<'_> {
        SignoffFields {
            signature: &mut self.signature,
            witness: &mut self.witness,
            signed_on: &mut self.signed_on,
            witnessed_on: &mut self.witnessed_on,
        }
    }
}

impl Signable for Protocol {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("protocol")
    }

    fn signoff_fields(&mut self) -> SignoffFields<'_> {
        SignoffFields {
            signature: &mut self.signature,
            witness: &mut self.witness,
            signed_on: &mut self.signed_on,
            witnessed_on: &mut self.witnessed_on,
        }
    }
}

/// Record a signature
pub fn sign<T: Signable>(
    doc: &mut T,
    signer: impl Into<String>,
    at: DateTime<Utc>,
) -> Result<(), EngineError> {
    if !doc.accepts_signoff() {
        return Err(EngineError::NotSignable(doc.label().to_string()));
    }
    let signer = signer.into();
    tracing::info!(target_doc = doc.label(), signer = %signer, "signed");
    let fields = doc.signoff_fields();
    *fields.signature = Some(signer);
    *fields.signed_on = Some(at);
    Ok(())
}

/// Record a witness; the document must already be signed
pub fn witness<T: Signable>(
    doc: &mut T,
    witness: impl Into<String>,
    at: DateTime<Utc>,
) -> Result<(), EngineError> {
    if !doc.accepts_signoff() {
        return Err(EngineError::NotSignable(doc.label().to_string()));
    }
    let label = doc.label().to_string();
    let witness = witness.into();
    let fields = doc.signoff_fields();
    if fields.signed_on.is_none() {
        return Err(EngineError::NotSigned(label));
    }
    tracing::info!(target_doc = %label, witness = %witness, "witnessed");
    *fields.witness = Some(witness);
    *fields.witnessed_on = Some(at);
    Ok(())
}

/// Check sign-off fields that were set directly instead of through
/// [`sign`] and [`witness`]
///
/// The same rules apply: no sign-off on a document that does not take them,
/// and no witness without a signature.
pub fn check_signoff<T: Signable>(doc: &mut T) -> Result<(), EngineError> {
    let accepts = doc.accepts_signoff();
    let label = doc.label().to_string();
    let fields = doc.signoff_fields();
    let touched = fields.signed_on.is_some() || fields.witnessed_on.is_some();
    if touched && !accepts {
        return Err(EngineError::NotSignable(label));
    }
    if fields.witnessed_on.is_some() && fields.signed_on.is_none() {
        return Err(EngineError::NotSigned(label));
    }
    Ok(())
}

/// Remove the signature and any witness
pub fn unsign<T: Signable>(doc: &mut T) {
    tracing::info!(target_doc = doc.label(), "signature removed");
    let fields = doc.signoff_fields();
    *fields.signature = None;
    *fields.signed_on = None;
    *fields.witness = None;
    *fields.witnessed_on = None;
}

/// Remove the witness only
pub fn unwitness<T: Signable>(doc: &mut T) {
    tracing::info!(target_doc = doc.label(), "witness removed");
    let fields = doc.signoff_fields();
    *fields.witness = None;
    *fields.witnessed_on = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_model::SectionDefinition;

    fn open_section() -> Section {
        Section {
            definition: SectionDefinition::new("s1"),
            ..Default::default()
        }
    }

    #[test]
    fn sign_then_witness_closes() {
        let mut section = open_section();
        sign(&mut section, "alice", Utc::now()).unwrap();
        witness(&mut section, "bob", Utc::now()).unwrap();
        assert!(section.is_closed());
        assert_eq!(section.signature.as_deref(), Some("alice"));
        assert_eq!(section.witness.as_deref(), Some("bob"));
    }

    #[test]
    fn witness_requires_signature() {
        let mut section = open_section();
        assert_eq!(
            witness(&mut section, "bob", Utc::now()),
            Err(EngineError::NotSigned("s1".into()))
        );
        assert!(!section.is_touched());
    }

    #[test]
    fn unsign_clears_witness() {
        let mut section = open_section();
        sign(&mut section, "alice", Utc::now()).unwrap();
        witness(&mut section, "bob", Utc::now()).unwrap();
        unsign(&mut section);
        assert!(!section.is_touched());
        assert!(section.witness.is_none());
    }

    #[test]
    fn unwitness_keeps_signature() {
        let mut section = open_section();
        sign(&mut section, "alice", Utc::now()).unwrap();
        witness(&mut section, "bob", Utc::now()).unwrap();
        unwitness(&mut section);
        assert!(section.signed_on.is_some());
        assert!(section.witnessed_on.is_none());
    }

    #[test]
    fn unsignable_section_rejects_signoff() {
        let mut section = Section {
            definition: SectionDefinition::new("notes").with_requirements(false, false),
            ..Default::default()
        };
        assert_eq!(
            sign(&mut section, "alice", Utc::now()),
            Err(EngineError::NotSignable("notes".into()))
        );
    }

    #[test]
    fn direct_signoff_fields_follow_transition_rules() {
        let mut section = open_section();
        assert_eq!(check_signoff(&mut section), Ok(()));

        section.witnessed_on = Some(Utc::now());
        assert_eq!(check_signoff(&mut section), Err(EngineError::NotSigned("s1".into())));

        section.signed_on = Some(Utc::now());
        assert_eq!(check_signoff(&mut section), Ok(()));

        section.definition = section.definition.clone().with_requirements(false, false);
        assert_eq!(check_signoff(&mut section), Err(EngineError::NotSignable("s1".into())));
    }

    #[test]
    fn signing_locks_protocol() {
        let mut protocol = Protocol::new().with_name("Extraction");
        assert!(!protocol.is_locked());
        sign(&mut protocol, "alice", Utc::now()).unwrap();
        assert!(protocol.is_locked());
        unsign(&mut protocol);
        assert!(!protocol.is_locked());
    }
}
