//! Gesture labels and their formations.
//!
//! The hand tracker upstream of the engine reports one label per detection
//! cycle. [`Gesture::from_label`] accepts the tracker's strings, and
//! [`Gesture::formation`] maps each gesture to the shape it summons. A simple
//! landmark classifier, [`classify`], is provided for trackers that report raw
//! hand landmarks instead of labels.

use crate::formation::Formation;
use glam::Vec3;
use std::fmt;

/// Recognized hand gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gesture {
    /// All four fingers folded.
    Fist,
    /// Index and middle finger raised.
    VSign,
    /// All four fingers raised.
    OpenHand,
    /// Thumb tip touching the index tip.
    FingerHeart,
    /// No hand in view.
    #[default]
    None,
    /// A hand is visible but matches no gesture.
    Unknown,
}

impl Gesture {
    /// Parse a tracker label. Unrecognized labels map to [`Gesture::Unknown`].
    pub fn from_label(label: &str) -> Self {
        match label {
            "Fist" => Gesture::Fist,
            "V-Sign" | "V Sign" => Gesture::VSign,
            "Open Hand" | "Open-Hand" => Gesture::OpenHand,
            "Finger Heart" | "Finger-Heart" => Gesture::FingerHeart,
            "None" | "" => Gesture::None,
            _ => Gesture::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gesture::Fist => "Fist",
            Gesture::VSign => "V-Sign",
            Gesture::OpenHand => "Open Hand",
            Gesture::FingerHeart => "Finger Heart",
            Gesture::None => "None",
            Gesture::Unknown => "Unknown",
        }
    }

    /// The formation this gesture summons.
    pub fn formation(self) -> Formation {
        match self {
            Gesture::Fist => Formation::Saturn,
            Gesture::VSign => Formation::text("I LOVE YOU"),
            Gesture::FingerHeart => Formation::Heart,
            Gesture::OpenHand => Formation::text("HAPPY NEW YEAR"),
            Gesture::None | Gesture::Unknown => Formation::Cube,
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for Gesture {
    fn from(label: &str) -> Self {
        Gesture::from_label(label)
    }
}

/// Number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Normalized hand landmarks: image-space x/y in `[0, 1]` with y growing
/// downward, and relative depth in z.
pub type HandLandmarks = [Vec3; LANDMARK_COUNT];

const THUMB_TIP: usize = 4;
const INDEX_MCP: usize = 5;
const INDEX_TIP: usize = 8;
const MIDDLE_MCP: usize = 9;
const MIDDLE_TIP: usize = 12;
const RING_MCP: usize = 13;
const RING_TIP: usize = 16;
const PINKY_MCP: usize = 17;
const PINKY_TIP: usize = 20;

/// Thumb-to-index distance under which the pose reads as a finger heart.
const PINCH_DISTANCE: f32 = 0.05;

/// Classify the first visible hand.
///
/// A finger counts as raised when its tip is above its knuckle. Poses are
/// tested in order: fist, V-sign, open hand, then finger heart.
pub fn classify(hands: &[HandLandmarks]) -> Gesture {
    let Some(lm) = hands.first() else {
        return Gesture::None;
    };

    let raised = |tip: usize, mcp: usize| lm[tip].y < lm[mcp].y;
    let index = raised(INDEX_TIP, INDEX_MCP);
    let middle = raised(MIDDLE_TIP, MIDDLE_MCP);
    let ring = raised(RING_TIP, RING_MCP);
    let pinky = raised(PINKY_TIP, PINKY_MCP);

    match (index, middle, ring, pinky) {
        (false, false, false, false) => Gesture::Fist,
        (true, true, false, false) => Gesture::VSign,
        (true, true, true, true) => Gesture::OpenHand,
        _ if lm[THUMB_TIP].distance(lm[INDEX_TIP]) < PINCH_DISTANCE => Gesture::FingerHeart,
        _ => Gesture::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A hand with every knuckle at y = 0.5 and the chosen fingers raised.
    fn hand(index: bool, middle: bool, ring: bool, pinky: bool) -> HandLandmarks {
        let mut lm = [Vec3::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        let tip_y = |up: bool| if up { 0.2 } else { 0.7 };
        lm[INDEX_TIP] = Vec3::new(0.4, tip_y(index), 0.0);
        lm[MIDDLE_TIP] = Vec3::new(0.5, tip_y(middle), 0.0);
        lm[RING_TIP] = Vec3::new(0.6, tip_y(ring), 0.0);
        lm[PINKY_TIP] = Vec3::new(0.7, tip_y(pinky), 0.0);
        lm[THUMB_TIP] = Vec3::new(0.1, 0.6, 0.0);
        lm
    }

    #[test]
    fn test_label_round_trip() {
        for g in [
            Gesture::Fist,
            Gesture::VSign,
            Gesture::OpenHand,
            Gesture::FingerHeart,
            Gesture::None,
            Gesture::Unknown,
        ] {
            assert_eq!(Gesture::from_label(g.label()), g);
        }
    }

    #[test]
    fn test_hyphenated_labels() {
        assert_eq!(Gesture::from_label("Open-Hand"), Gesture::OpenHand);
        assert_eq!(Gesture::from_label("Finger-Heart"), Gesture::FingerHeart);
        assert_eq!(Gesture::from("Thumbs Up"), Gesture::Unknown);
    }

    #[test]
    fn test_formation_mapping() {
        assert_eq!(Gesture::Fist.formation(), Formation::Saturn);
        assert_eq!(Gesture::VSign.formation(), Formation::text("I LOVE YOU"));
        assert_eq!(Gesture::FingerHeart.formation(), Formation::Heart);
        assert_eq!(Gesture::OpenHand.formation(), Formation::text("HAPPY NEW YEAR"));
        assert_eq!(Gesture::None.formation(), Formation::Cube);
        assert_eq!(Gesture::from_label("whatever").formation(), Formation::Cube);
    }

    #[test]
    fn test_classify_poses() {
        assert_eq!(classify(&[]), Gesture::None);
        assert_eq!(classify(&[hand(false, false, false, false)]), Gesture::Fist);
        assert_eq!(classify(&[hand(true, true, false, false)]), Gesture::VSign);
        assert_eq!(classify(&[hand(true, true, true, true)]), Gesture::OpenHand);
        assert_eq!(classify(&[hand(true, false, false, false)]), Gesture::Unknown);
    }

    #[test]
    fn test_classify_finger_heart() {
        let mut lm = hand(true, false, false, false);
        lm[THUMB_TIP] = lm[INDEX_TIP] + Vec3::new(0.01, 0.0, 0.0);
        assert_eq!(classify(&[lm]), Gesture::FingerHeart);
    }
}
