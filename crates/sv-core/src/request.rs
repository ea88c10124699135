//! Assembly request model and the request validator.
//!
//! The metadata field of an upload is a JSON object in the client's
//! camelCase schema:
//!
//! ```json
//! {
//!   "scenes": [{ "imageDuration": 2.0 }, { "imageDuration": 3.5 }],
//!   "resolution": { "width": 1920, "height": 1080 },
//!   "frameRate": 30
//! }
//! ```
//!
//! [`validate`] turns that text plus the supplied asset counts into an
//! [`AssemblyRequest`] or a typed failure. It is a pure function: nothing is
//! staged or spawned until it has passed.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Largest accepted output dimension (8K UHD width).
pub const MAX_DIMENSION: u32 = 7680;

/// One scene: a still image shown for `image_duration` seconds over its
/// narration clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneSpec {
    /// Seconds the scene's image stays on screen.
    pub image_duration: f64,
}

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The validated, in-memory representation of one assembly job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyRequest {
    /// Scenes in playback order; index `i` pairs with image `i` and audio `i`.
    pub scenes: Vec<SceneSpec>,
    pub resolution: Resolution,
    /// Output frames per second.
    pub frame_rate: f64,
}

impl AssemblyRequest {
    /// Parse and type-check a metadata payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] carrying the parse or constraint
    /// error text.
    pub fn parse(metadata: &str) -> Result<Self> {
        let request: AssemblyRequest = serde_json::from_str(metadata)
            .map_err(|e| Error::InvalidMetadata(e.to_string()))?;
        request.check_constraints().map_err(Error::InvalidMetadata)?;
        Ok(request)
    }

    fn check_constraints(&self) -> std::result::Result<(), String> {
        if self.scenes.is_empty() {
            return Err("scenes must contain at least one scene".into());
        }

        for (i, scene) in self.scenes.iter().enumerate() {
            if !is_positive(scene.image_duration) {
                return Err(format!(
                    "scenes[{i}].imageDuration must be a positive number, got {}",
                    scene.image_duration
                ));
            }
        }

        let Resolution { width, height } = self.resolution;
        for (name, value) in [("width", width), ("height", height)] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(format!(
                    "resolution.{name} must be between 1 and {MAX_DIMENSION}, got {value}"
                ));
            }
            if value % 2 != 0 {
                return Err(format!("resolution.{name} must be even, got {value}"));
            }
        }

        if !is_positive(self.frame_rate) {
            return Err(format!(
                "frameRate must be a positive number, got {}",
                self.frame_rate
            ));
        }

        Ok(())
    }

    /// Number of declared scenes.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Per-scene durations in playback order.
    pub fn durations(&self) -> Vec<f64> {
        self.scenes.iter().map(|s| s.image_duration).collect()
    }

    /// Sum of all scene durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.scenes.iter().map(|s| s.image_duration).sum()
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Validate a metadata payload against the number of supplied assets.
///
/// Images are checked before audio and only the first mismatch is reported.
///
/// # Errors
///
/// - [`Error::InvalidMetadata`] if the payload does not parse or violates
///   the schema constraints.
/// - [`Error::InvalidRequest`] if either asset count differs from the
///   number of scenes.
pub fn validate(metadata: &str, image_count: usize, audio_count: usize) -> Result<AssemblyRequest> {
    let request = AssemblyRequest::parse(metadata)?;
    let expected = request.scene_count();

    if image_count != expected {
        return Err(Error::invalid_request(format!(
            "Expected {expected} images, got {image_count}"
        )));
    }
    if audio_count != expected {
        return Err(Error::invalid_request(format!(
            "Expected {expected} audio files, got {audio_count}"
        )));
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const THREE_SCENES: &str = r#"{
        "scenes": [{"imageDuration": 2.0}, {"imageDuration": 3.5}, {"imageDuration": 1.5}],
        "resolution": {"width": 1920, "height": 1080},
        "frameRate": 30
    }"#;

    #[test]
    fn parses_client_schema() {
        let req = validate(THREE_SCENES, 3, 3).unwrap();
        assert_eq!(req.scene_count(), 3);
        assert_eq!(req.durations(), vec![2.0, 3.5, 1.5]);
        assert_eq!(req.resolution.to_string(), "1920x1080");
        assert_eq!(req.frame_rate, 30.0);
        assert!((req.total_duration() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"scenes":[{"imageDuration":1,"caption":"hi"}],
            "resolution":{"width":640,"height":360},"frameRate":24,"title":"x"}"#;
        assert!(validate(json, 1, 1).is_ok());
    }

    #[test]
    fn malformed_json_is_invalid_metadata() {
        let err = validate("{not json", 1, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
        assert!(err.to_string().starts_with("Invalid metadata JSON: "));
    }

    #[test]
    fn missing_field_reports_parse_error_text() {
        let json = r#"{"scenes":[{"imageDuration":1}],"resolution":{"width":640,"height":360}}"#;
        let err = validate(json, 1, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
        assert!(err.to_string().contains("frameRate"), "{err}");
    }

    #[test]
    fn wrong_type_is_invalid_metadata() {
        let json = r#"{"scenes":[{"imageDuration":"two"}],
            "resolution":{"width":640,"height":360},"frameRate":24}"#;
        let err = validate(json, 1, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let json = r#"{"scenes":[{"imageDuration":1},{"imageDuration":0}],
            "resolution":{"width":640,"height":360},"frameRate":24}"#;
        let err = validate(json, 2, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
        assert!(err.to_string().contains("scenes[1].imageDuration"), "{err}");
    }

    #[test]
    fn empty_scenes_are_rejected() {
        let json = r#"{"scenes":[],"resolution":{"width":640,"height":360},"frameRate":24}"#;
        let err = validate(json, 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
    }

    #[test]
    fn bad_resolution_is_rejected() {
        for (w, h) in [(0, 360), (641, 360), (640, 9000)] {
            let json = format!(
                r#"{{"scenes":[{{"imageDuration":1}}],"resolution":{{"width":{w},"height":{h}}},"frameRate":24}}"#
            );
            let err = validate(&json, 1, 1).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidMetadata, "{w}x{h}");
        }
    }

    #[test]
    fn negative_width_fails_to_parse() {
        let json = r#"{"scenes":[{"imageDuration":1}],"resolution":{"width":-640,"height":360},"frameRate":24}"#;
        let err = validate(json, 1, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        let json = r#"{"scenes":[{"imageDuration":1}],"resolution":{"width":640,"height":360},"frameRate":0}"#;
        let err = validate(json, 1, 1).unwrap_err();
        assert!(err.to_string().contains("frameRate"));
    }

    #[test]
    fn image_count_mismatch() {
        let err = validate(THREE_SCENES, 2, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.to_string(), "Expected 3 images, got 2");
    }

    #[test]
    fn audio_count_mismatch() {
        let json = r#"{"scenes":[{"imageDuration":1},{"imageDuration":1}],
            "resolution":{"width":640,"height":360},"frameRate":24}"#;
        let err = validate(json, 2, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.to_string(), "Expected 2 audio files, got 1");
    }

    #[test]
    fn images_are_checked_before_audio() {
        let err = validate(THREE_SCENES, 1, 5).unwrap_err();
        assert_eq!(err.to_string(), "Expected 3 images, got 1");
    }

    #[test]
    fn metadata_errors_take_priority_over_counts() {
        let err = validate("[]", 4, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
    }
}
