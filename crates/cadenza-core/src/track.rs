use std::fmt;

/// Independent media category.
///
/// Each track type gets its own decision state and its own slice of the
/// telemetry feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackType {
    Video,
    Audio,
    Text,
    Image,
}

impl TrackType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(TrackType::Video, "video")]
    #[case(TrackType::Audio, "audio")]
    #[case(TrackType::Text, "text")]
    #[case(TrackType::Image, "image")]
    fn display_uses_lowercase_name(#[case] track: TrackType, #[case] expected: &str) {
        assert_eq!(track.to_string(), expected);
    }
}
