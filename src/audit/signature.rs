//! Two-party signature capture.
//!
//! Both parties sign on the same [`CaptureSurface`]. The [`SignatureSequencer`] enforces
//! the order manager → auditor and clears the surface between them, so strokes from the
//! first signature can never end up in the second.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::core::error::AuditError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One continuous pen-down → pen-up gesture.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stroke {
    pub points: Vec<Point>,
}

impl Stroke {
    /// A stroke leaves ink only once the pen has moved.
    pub fn is_drawn(&self) -> bool {
        self.points.len() >= 2
    }
}

/// Drawing surface recording strokes as point lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSurface {
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
}

impl CaptureSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_stroke(&mut self, at: Point) {
        self.end_stroke();
        self.active = Some(Stroke { points: vec![at] });
    }

    /// Extend the stroke in progress. Movement without a pen-down is ignored.
    pub fn extend_stroke(&mut self, to: Point) {
        if let Some(stroke) = self.active.as_mut() {
            stroke.points.push(to);
        }
    }

    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.active.take() {
            self.strokes.push(stroke);
        }
    }

    /// Replay complete strokes, as recorded by an external capture device.
    pub fn load_strokes(&mut self, strokes: Vec<Stroke>) {
        self.end_stroke();
        self.strokes.extend(strokes);
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    pub fn drawn_strokes(&self) -> usize {
        self.strokes
            .iter()
            .chain(self.active.iter())
            .filter(|s| s.is_drawn())
            .count()
    }

    pub fn is_blank(&self) -> bool {
        self.drawn_strokes() == 0
    }

    /// Payload for the ink on the surface, or `None` when nothing was drawn.
    pub fn snapshot(&self) -> Option<SignaturePayload> {
        let strokes: Vec<&Stroke> = self
            .strokes
            .iter()
            .chain(self.active.iter())
            .filter(|s| s.is_drawn())
            .collect();
        if strokes.is_empty() {
            return None;
        }
        let mut path = String::new();
        for stroke in &strokes {
            for (i, p) in stroke.points.iter().enumerate() {
                if !path.is_empty() {
                    path.push(' ');
                }
                let cmd = if i == 0 { 'M' } else { 'L' };
                path.push_str(&format!("{} {} {}", cmd, fmt_coord(p.x), fmt_coord(p.y)));
            }
        }
        Some(SignaturePayload {
            svg_path: path,
            stroke_count: strokes.len(),
        })
    }
}

fn fmt_coord(v: f32) -> String {
    let rounded = (v * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Captured signature encoded as SVG path data (`M x y L x y ...`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignaturePayload {
    svg_path: String,
    stroke_count: usize,
}

impl SignaturePayload {
    /// Rebuild a payload from stored path data. Empty data is rejected.
    pub fn from_svg_path(path: &str) -> Result<Self, AuditError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(AuditError::Validation(
                "stored signature is empty".to_string(),
            ));
        }
        let stroke_count = trimmed.split_whitespace().filter(|t| *t == "M").count();
        Ok(Self {
            svg_path: trimmed.to_string(),
            stroke_count,
        })
    }

    pub fn svg_path(&self) -> &str {
        &self.svg_path
    }

    pub fn stroke_count(&self) -> usize {
        self.stroke_count
    }

    /// SHA-256 of the path data, for logs that must not carry the signature itself.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.svg_path.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignerRole {
    Manager,
    Auditor,
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerRole::Manager => f.write_str("manager"),
            SignerRole::Auditor => f.write_str("auditor"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequencerState {
    AwaitingManager,
    AwaitingAuditor,
    Done,
}

#[derive(Debug, Clone)]
pub struct SignatureSequencer {
    state: SequencerState,
    surface: CaptureSurface,
    manager: Option<SignaturePayload>,
    auditor: Option<SignaturePayload>,
}

impl Default for SignatureSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureSequencer {
    pub fn new() -> Self {
        Self {
            state: SequencerState::AwaitingManager,
            surface: CaptureSurface::new(),
            manager: None,
            auditor: None,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn current_signer(&self) -> Option<SignerRole> {
        match self.state {
            SequencerState::AwaitingManager => Some(SignerRole::Manager),
            SequencerState::AwaitingAuditor => Some(SignerRole::Auditor),
            SequencerState::Done => None,
        }
    }

    pub fn surface(&self) -> &CaptureSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut CaptureSurface {
        &mut self.surface
    }

    /// Wipe the surface without changing whose turn it is.
    pub fn clear_surface(&mut self) {
        self.surface.clear();
    }

    /// Accept the ink on the surface for the current signer.
    ///
    /// A blank surface is rejected without a transition. Accepting the manager's
    /// signature clears the surface for the auditor.
    pub fn submit(&mut self) -> Result<SequencerState, AuditError> {
        let signer = self
            .current_signer()
            .ok_or_else(|| AuditError::Validation("both signatures already captured".into()))?;
        let payload = self
            .surface
            .snapshot()
            .ok_or(AuditError::EmptySignature(signer))?;

        match signer {
            SignerRole::Manager => {
                self.manager = Some(payload);
                self.clear_surface();
                self.state = SequencerState::AwaitingAuditor;
            }
            SignerRole::Auditor => {
                self.auditor = Some(payload);
                self.state = SequencerState::Done;
            }
        }
        tracing::debug!(signer = %signer, state = ?self.state, "signature accepted");
        Ok(self.state)
    }

    pub fn manager_signature(&self) -> Option<&SignaturePayload> {
        self.manager.as_ref()
    }

    pub fn auditor_signature(&self) -> Option<&SignaturePayload> {
        self.auditor.as_ref()
    }

    /// Both payloads, once the sequence is done.
    pub fn into_signatures(self) -> Option<(SignaturePayload, SignaturePayload)> {
        match (self.state, self.manager, self.auditor) {
            (SequencerState::Done, Some(m), Some(a)) => Some((m, a)),
            _ => None,
        }
    }
}
