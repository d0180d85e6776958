/// One recognized utterance.
///
/// Timings are fixed at construction; only the text can change afterwards
/// (translation rewrites it in place).
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    start: f64,
    end: f64,
    text: String,
}

impl Segment {
    /// Create a segment, clamping negative or non-finite starts to zero and
    /// an `end` before `start` up to `start`.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        let start = if start.is_finite() { start.max(0.0) } else { 0.0 };
        let end = if end.is_finite() { end.max(start) } else { start };

        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Start time in seconds
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered segments plus the language the recognizer detected.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    segments: Vec<Segment>,
    detected_language: String,
}

impl Transcript {
    /// Build a transcript. Segments whose text is blank after trimming are
    /// dropped; the rest are stably sorted by start time, whatever order the
    /// backend produced.
    pub fn new(mut segments: Vec<Segment>, detected_language: impl Into<String>) -> Self {
        segments.retain(|s| !s.text.trim().is_empty());
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));

        Self {
            segments,
            detected_language: detected_language.into(),
        }
    }

    pub fn empty(detected_language: impl Into<String>) -> Self {
        Self::new(Vec::new(), detected_language)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Mutable access for in-place text rewrites. Segment timings stay
    /// read-only through `Segment`'s own API.
    pub fn segments_mut(&mut self) -> std::slice::IterMut<'_, Segment> {
        self.segments.iter_mut()
    }

    pub fn detected_language(&self) -> &str {
        &self.detected_language
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Joined, trimmed text of all segments.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|seg| seg.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
