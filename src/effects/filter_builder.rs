//! Filter Chain Builder
//!
//! Translates normalized effect parameters into the encoder's filter-graph
//! expression string. The clause grammar is `name=key=value[:key=value...]`,
//! clauses joined with `,`, and is consumed verbatim by the external
//! encoder's filter-graph argument: clause names, parameter keys, and value
//! formulas must not drift.

use serde::{Deserialize, Serialize};

/// Normalized per-element effect parameters.
///
/// Brightness, contrast, saturation, and grayscale are percentages in
/// `[-100, 100]` (grayscale in `[0, 100]`); blur is a pixel radius; hue is
/// in degrees. Unset parameters contribute no clause.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grayscale: Option<f64>,
}

impl EffectParams {
    /// True when no parameter is set, i.e. the chain would be empty
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none()
            && self.contrast.is_none()
            && self.saturation.is_none()
            && self.blur.is_none()
            && self.hue.is_none()
            && self.grayscale.is_none()
    }

    /// Builds the comma-joined filter-chain expression, one clause per set
    /// parameter, in field declaration order. Returns `None` when no
    /// parameter is set so callers can omit the filter argument entirely.
    pub fn build_filter_chain(&self) -> Option<String> {
        let mut clauses = Vec::new();

        if let Some(brightness) = self.brightness {
            clauses.push(format!("eq=brightness={}", brightness / 100.0));
        }
        if let Some(contrast) = self.contrast {
            clauses.push(format!("eq=contrast={}", 1.0 + contrast / 100.0));
        }
        if let Some(saturation) = self.saturation {
            clauses.push(format!("eq=saturation={}", 1.0 + saturation / 100.0));
        }
        if let Some(blur) = self.blur {
            clauses.push(format!("boxblur={blur}:1"));
        }
        if let Some(hue) = self.hue {
            clauses.push(format!("hue=h={hue}"));
        }
        if let Some(grayscale) = self.grayscale {
            // Grayscale is expressed as inverse saturation.
            clauses.push(format!("hue=s={}", 1.0 - grayscale / 100.0));
        }

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(","))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
