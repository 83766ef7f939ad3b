//! The signer manifest.
//!
//! A manifest is a flat list of records, each naming a file the signer must
//! replace in place with its signed equivalent. The signer either processes
//! every record or fails the whole batch.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::types::{Phase, SigningProfile};

/// One file handed to the external signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Absolute path of the file to sign in place.
    pub path: PathBuf,
    /// Signing identity to apply.
    pub profile: SigningProfile,
    /// The file is a zip bundle whose entries the signer processes individually.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub zip_bundle: bool,
    /// Application name used for notarization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

/// All records submitted in a single signer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningManifest {
    /// Phase this manifest belongs to.
    pub phase: Phase,
    /// Records in submission order.
    pub records: Vec<ManifestRecord>,
}

impl SigningManifest {
    /// Create an empty manifest for `phase`.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            records: Vec::new(),
        }
    }

    /// Append a record.
    pub fn push(&mut self, record: ManifestRecord) {
        self.records.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the manifest carries no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render as an MSBuild props file consumed by the signing project.
    ///
    /// ```
    /// use relsign_schema::{ManifestRecord, Phase, SigningManifest, SigningProfile};
    ///
    /// let mut m = SigningManifest::new(Phase::Signatures);
    /// m.push(ManifestRecord {
    ///     path: "/w/go.zip.sig".into(),
    ///     profile: SigningProfile::DetachedSignature,
    ///     zip_bundle: false,
    ///     app_name: None,
    /// });
    /// assert!(m.to_props().contains(
    ///     r#"<FilesToSign Include="/w/go.zip.sig" Authenticode="LinuxSignManagedLanguageCompiler" />"#
    /// ));
    /// ```
    pub fn to_props(&self) -> String {
        let mut out = String::new();
        out.push_str("<Project>\n");
        out.push_str("  <ItemGroup>\n");
        for record in &self.records {
            let _ = write!(
                out,
                "    <FilesToSign Include=\"{}\" Authenticode=\"{}\"",
                escape_attr(&record.path.to_string_lossy()),
                escape_attr(record.profile.as_str()),
            );
            if record.zip_bundle {
                out.push_str(" Zip=\"true\"");
            }
            if let Some(name) = &record.app_name {
                let _ = write!(out, " MacAppName=\"{}\"", escape_attr(name));
            }
            out.push_str(" />\n");
        }
        out.push_str("  </ItemGroup>\n");
        out.push_str("</Project>\n");
        out
    }

    /// Render as pretty JSON for audit logs.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
