use crate::TrackType;

/// One encoded variant of an [`Adaptation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Representation {
    pub id: String,
    /// Nominal bitrate in bits per second.
    pub bitrate: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Codec string (e.g., "avc1.64001f").
    pub codecs: Option<String>,
}

impl Representation {
    pub fn new(id: impl Into<String>, bitrate: u64) -> Self {
        Self {
            id: id.into(),
            bitrate,
            width: None,
            height: None,
            codecs: None,
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

impl AsRef<Representation> for Representation {
    fn as_ref(&self) -> &Representation {
        self
    }
}

/// Set of interchangeable representations for one track component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adaptation {
    pub id: String,
    pub track_type: TrackType,
    pub representations: Vec<Representation>,
}

impl Adaptation {
    pub fn new(
        id: impl Into<String>,
        track_type: TrackType,
        representations: Vec<Representation>,
    ) -> Self {
        Self {
            id: id.into(),
            track_type,
            representations,
        }
    }
}

/// Timeline segment of the overall content.
#[derive(Clone, Debug, PartialEq)]
pub struct Period {
    pub id: String,
    /// Start of the period on the presentation timeline, in seconds.
    pub start_secs: f64,
}

impl Period {
    pub fn new(id: impl Into<String>, start_secs: f64) -> Self {
        Self {
            id: id.into(),
            start_secs,
        }
    }
}
