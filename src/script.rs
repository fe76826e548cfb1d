use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SegmentationError;

// @module: Narration script processing and segmentation

// @const: Sentence boundary candidates (punctuation + trailing whitespace)
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Outer wrapper tag every markup chunk must carry to be playable alone
const WRAPPER_OPEN: &str = "<speak>";
const WRAPPER_CLOSE: &str = "</speak>";

/// Abbreviations whose trailing period never ends a sentence
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sr.", "Jr.", "etc.", "vs.", "e.g.", "i.e.",
];

/// The kind of content a segment carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Unstructured prose
    PlainText,
    /// A well-formed markup chunk wrapped in its own top-level container
    Markup,
}

/// The full narration input, tagged by dialect.
///
/// Replaces the boolean "is structured" flag: the variant is threaded through
/// segmenter selection and the provider request, so there is no parallel
/// branching at call sites.
#[derive(Debug, Clone)]
pub enum NarrationDocument {
    /// Blank-line-delimited prose
    PlainText(String),
    /// Markup script using the voice/break/emphasis vocabulary
    Markup(String),
}

impl NarrationDocument {
    /// Build a document from raw content, detecting the dialect from the
    /// leading wrapper tag.
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        if content.trim_start().starts_with("<speak") {
            Self::Markup(content)
        } else {
            Self::PlainText(content)
        }
    }

    /// Read a script file and detect its dialect
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read script file: {:?}", path.as_ref()))?;
        Ok(Self::from_content(content))
    }

    /// The raw document body
    pub fn content(&self) -> &str {
        match self {
            Self::PlainText(s) | Self::Markup(s) => s,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::PlainText(_) => SegmentKind::PlainText,
            Self::Markup(_) => SegmentKind::Markup,
        }
    }
}

/// A bounded, independently synthesizable unit of the narration document
#[derive(Debug, Clone)]
pub struct Segment {
    // @field: Position in the original document, 0-based
    pub index: usize,

    // @field: Segment payload (for Markup, includes its own wrapper)
    pub content: String,

    // @field: Content dialect
    pub kind: SegmentKind,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "segment {} ({} chars, {:?})",
            self.index,
            self.content.chars().count(),
            self.kind
        )
    }
}

/// Split the document with the segmenter matching its variant
pub fn segment_document(
    document: &NarrationDocument,
    max_chars: usize,
) -> Result<Vec<Segment>, SegmentationError> {
    let (chunks, kind) = match document {
        NarrationDocument::PlainText(text) => (
            PlainTextSegmenter::new(max_chars).segment(text)?,
            SegmentKind::PlainText,
        ),
        NarrationDocument::Markup(markup) => (
            MarkupSegmenter::new(max_chars).segment(markup)?,
            SegmentKind::Markup,
        ),
    };

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, content)| Segment {
            index,
            content,
            kind,
        })
        .collect())
}

/// Splits unstructured narration into bounded, semantically-clean chunks.
///
/// Blank-line-delimited paragraphs are atomic units, greedily packed; a
/// paragraph that alone exceeds the budget falls back to sentence packing.
pub struct PlainTextSegmenter {
    max_chars: usize,
    abbreviations: Vec<String>,
}

impl PlainTextSegmenter {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the abbreviation set that suppresses sentence splits
    pub fn with_abbreviations(mut self, abbreviations: Vec<String>) -> Self {
        self.abbreviations = abbreviations;
        self
    }

    /// Split `text` into ordered chunks, each at most `max_chars` characters.
    ///
    /// Joining the chunks back together (paragraphs with blank lines,
    /// sentences with spaces) reconstructs the input modulo whitespace
    /// normalization.
    pub fn segment(&self, text: &str) -> Result<Vec<String>, SegmentationError> {
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        // First pass: greedy paragraph packing
        let mut packed: Vec<String> = Vec::new();
        let mut current = String::new();
        for paragraph in paragraphs {
            let added = if current.is_empty() {
                paragraph.chars().count()
            } else {
                current.chars().count() + 2 + paragraph.chars().count()
            };

            if added > self.max_chars && !current.is_empty() {
                packed.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
        if !current.is_empty() {
            packed.push(current);
        }

        // Second pass: any chunk still over budget gets re-split at
        // sentence boundaries and re-packed
        let mut validated: Vec<String> = Vec::new();
        for chunk in packed {
            if chunk.chars().count() <= self.max_chars {
                validated.push(chunk);
                continue;
            }

            let mut part = String::new();
            for sentence in self.split_into_sentences(&chunk) {
                let sentence_len = sentence.chars().count();
                if sentence_len > self.max_chars {
                    return Err(SegmentationError::UnsplittableContent {
                        max_chars: self.max_chars,
                        reason: format!(
                            "a single sentence is {} chars long and has no split point",
                            sentence_len
                        ),
                    });
                }

                let added = if part.is_empty() {
                    sentence_len
                } else {
                    part.chars().count() + 1 + sentence_len
                };
                if added > self.max_chars && !part.is_empty() {
                    validated.push(std::mem::take(&mut part));
                }
                if !part.is_empty() {
                    part.push(' ');
                }
                part.push_str(&sentence);
            }
            if !part.is_empty() {
                validated.push(part);
            }
        }

        Ok(validated)
    }

    /// Split text into sentences at `.`/`!`/`?` followed by whitespace and an
    /// uppercase letter, keeping known abbreviations intact.
    pub fn split_into_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0usize;

        for mat in SENTENCE_BOUNDARY.find_iter(text) {
            // Boundary only counts when the next word starts uppercase
            let follows_uppercase = text[mat.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_uppercase());
            if !follows_uppercase {
                continue;
            }

            // A period closing a known abbreviation is not a sentence end
            let punct = text[mat.start()..].chars().next().unwrap_or('.');
            let candidate = &text[start..mat.start() + punct.len_utf8()];
            if punct == '.' && self.ends_with_abbreviation(candidate) {
                continue;
            }

            let trimmed = candidate.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            start = mat.end();
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }

        sentences
    }

    fn ends_with_abbreviation(&self, candidate: &str) -> bool {
        let last_token = candidate.rsplit(char::is_whitespace).next().unwrap_or("");
        self.abbreviations.iter().any(|abbr| last_token == abbr)
    }
}

/// Splits a markup narration at voice-block boundaries only, so every emitted
/// chunk is independently well-formed under its own wrapper.
///
/// Splitting inside an inline element is unsafe and never attempted: a single
/// voice block exceeding the budget is emitted as its own oversized chunk.
pub struct MarkupSegmenter {
    max_chars: usize,
}

impl MarkupSegmenter {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Split `markup` into ordered `<speak>`-wrapped chunks, each holding
    /// whole voice blocks and at most `max_chars` characters of block content
    /// (wrapper overhead excluded, as unavoidable duplication).
    pub fn segment(&self, markup: &str) -> Result<Vec<String>, SegmentationError> {
        check_balanced(markup).map_err(SegmentationError::MalformedMarkup)?;

        let body = markup
            .replace(WRAPPER_OPEN, "")
            .replace(WRAPPER_CLOSE, "")
            .trim()
            .to_string();

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::from(WRAPPER_OPEN);
        let mut current_len = 0usize;

        // Each piece keeps its own closing tag; trailing content outside any
        // voice block (a bare <break/>, say) comes through as the final
        // piece without one.
        for block in body.split_inclusive("</voice>") {
            if block.trim().is_empty() {
                continue;
            }

            let block_len = block.chars().count();

            if current_len + block_len > self.max_chars && current_len > 0 {
                current.push_str(WRAPPER_CLOSE);
                chunks.push(std::mem::replace(&mut current, String::from(WRAPPER_OPEN)));
                current_len = 0;
            }

            if block_len > self.max_chars {
                warn!(
                    "Voice block of {} chars exceeds the {}-char budget; emitting it whole rather than splitting inside an inline element",
                    block_len, self.max_chars
                );
            }

            current.push_str(block);
            current_len += block_len;
        }

        if current_len > 0 {
            current.push_str(WRAPPER_CLOSE);
            chunks.push(current);
        }

        // Voice blocks nested inside another element cannot be separated at
        // </voice> without breaking both sides. If any chunk came out
        // unbalanced, emit the whole document as one oversized chunk instead.
        if chunks.iter().any(|c| check_balanced(c).is_err()) {
            warn!(
                "Voice blocks are nested inside other elements; emitting the markup as a single chunk"
            );
            return Ok(vec![format!("{}{}{}", WRAPPER_OPEN, body, WRAPPER_CLOSE)]);
        }

        Ok(chunks)
    }
}

/// Verify every opened tag is closed, in order. Self-closing tags
/// (`<break time="300ms"/>`) and attributes are handled; comments and
/// CDATA are not part of the dialect.
pub fn check_balanced(markup: &str) -> Result<(), String> {
    let mut stack: Vec<String> = Vec::new();
    let mut rest = markup;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let close = after
            .find('>')
            .ok_or_else(|| format!("Unterminated tag near: {:.40}", &rest[open..]))?;
        let tag_body = &after[..close];

        if let Some(name) = tag_body.strip_prefix('/') {
            let name = name.trim();
            match stack.pop() {
                Some(top) if top == name => {}
                Some(top) => {
                    return Err(format!("Expected </{}> but found </{}>", top, name));
                }
                None => return Err(format!("Closing tag </{}> with nothing open", name)),
            }
        } else if !tag_body.ends_with('/') {
            let name: String = tag_body
                .chars()
                .take_while(|c| !c.is_whitespace())
                .collect();
            if name.is_empty() {
                return Err("Empty tag".to_string());
            }
            stack.push(name);
        }

        rest = &after[close + 1..];
    }

    if let Some(unclosed) = stack.pop() {
        return Err(format!("Tag <{}> is never closed", unclosed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejoin(chunks: &[String]) -> String {
        chunks.join(" ")
    }

    fn normalize_ws(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_shortText_shouldYieldSingleSegment() {
        let segmenter = PlainTextSegmenter::new(100);
        let chunks = segmenter.segment("Hello world.").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Hello world.");
    }

    #[test]
    fn test_paragraphPacking_shouldFlushOnOverflow() {
        let a = "a".repeat(40);
        let b = "b".repeat(40);
        let c = "c".repeat(40);
        let text = format!("{}\n\n{}\n\n{}", a, b, c);

        let chunks = PlainTextSegmenter::new(90).segment(&text).unwrap();
        // a+b fit together (82 chars), c overflows into its own chunk
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}\n\n{}", a, b));
        assert_eq!(chunks[1], c);
    }

    #[test]
    fn test_allSegments_shouldRespectBudget() {
        let text = (0..30)
            .map(|i| format!("Paragraph {} has some sentence content here.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let max = 120;
        let chunks = PlainTextSegmenter::new(max).segment(&text).unwrap();

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= max);
        }
        assert_eq!(normalize_ws(&rejoin(&chunks)), normalize_ws(&text));
    }

    #[test]
    fn test_oversizedParagraph_shouldFallBackToSentences() {
        let text = "First sentence is here. Second sentence follows on. Third one closes it out.";
        let chunks = PlainTextSegmenter::new(30).segment(text).unwrap();

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
        }
        assert_eq!(normalize_ws(&rejoin(&chunks)), normalize_ws(text));
    }

    #[test]
    fn test_abbreviation_shouldNotSplitSentence() {
        let segmenter = PlainTextSegmenter::new(100);
        let sentences =
            segmenter.split_into_sentences("Dr. Smith agreed. Mr. Jones did not. End.");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "Dr. Smith agreed.");
        assert_eq!(sentences[1], "Mr. Jones did not.");
    }

    #[test]
    fn test_lowercaseAfterPeriod_shouldNotSplit() {
        let segmenter = PlainTextSegmenter::new(100);
        let sentences = segmenter.split_into_sentences("approx. two weeks later. The end came.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_exclamationAndQuestion_shouldSplit() {
        let segmenter = PlainTextSegmenter::new(100);
        let sentences = segmenter.split_into_sentences("Really! Yes? Absolutely.");
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn test_unsplittableSentence_shouldError() {
        let giant = "x".repeat(200);
        let result = PlainTextSegmenter::new(50).segment(&giant);
        assert!(matches!(
            result,
            Err(SegmentationError::UnsplittableContent { .. })
        ));
    }

    #[test]
    fn test_twelveThousandCharScript_shouldYieldThreeSegments() {
        // Three ~4000-char paragraphs with blank-line breaks: exactly one
        // paragraph per 4800-char segment.
        let sentence = "The survey revealed a previously unknown companion object. ";
        let paragraph: String = sentence.repeat(67).trim_end().to_string();
        assert!(paragraph.chars().count() > 3900 && paragraph.chars().count() < 4800);
        let text = format!("{}\n\n{}\n\n{}", paragraph, paragraph, paragraph);
        assert!(text.chars().count() > 11000);

        let chunks = PlainTextSegmenter::new(4800).segment(&text).unwrap();
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 4800);
        }
        assert_eq!(normalize_ws(&chunks.join(" ")), normalize_ws(&text));
    }

    fn voice_block(name: &str, len: usize) -> String {
        let filler = "y".repeat(len);
        format!("<voice name=\"{}\">{}</voice>", name, filler)
    }

    #[test]
    fn test_markupChunks_shouldEachBeBalanced() {
        let markup = format!(
            "<speak>{}{}{}</speak>",
            voice_block("a", 50),
            voice_block("b", 50),
            voice_block("c", 50)
        );
        let chunks = MarkupSegmenter::new(100).segment(&markup).unwrap();

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.starts_with("<speak>"));
            assert!(chunk.ends_with("</speak>"));
            assert!(check_balanced(chunk).is_ok());
        }
    }

    #[test]
    fn test_markupSplit_shouldNeverCutInsideVoiceBlock() {
        let markup = format!(
            "<speak>{}{}</speak>",
            voice_block("a", 60),
            voice_block("b", 60)
        );
        let chunks = MarkupSegmenter::new(100).segment(&markup).unwrap();

        for chunk in &chunks {
            let opens = chunk.matches("<voice").count();
            let closes = chunk.matches("</voice>").count();
            assert_eq!(opens, closes);
        }
    }

    #[test]
    fn test_oversizedVoiceBlock_shouldBeEmittedWhole() {
        // Six blocks; block 4 alone exceeds the budget and must come out as
        // exactly one oversized chunk, with the rest maximally packed.
        let budget = 120;
        let blocks = vec![
            voice_block("a", 40),
            voice_block("b", 40),
            voice_block("c", 40),
            voice_block("d", 300),
            voice_block("e", 40),
            voice_block("f", 40),
        ];
        let markup = format!("<speak>{}</speak>", blocks.concat());
        let chunks = MarkupSegmenter::new(budget).segment(&markup).unwrap();

        let oversized: Vec<&String> = chunks
            .iter()
            .filter(|c| c.chars().count() > budget + "<speak></speak>".len())
            .collect();
        assert_eq!(oversized.len(), 1);
        assert!(oversized[0].contains(&"y".repeat(300)));
        assert_eq!(oversized[0].matches("<voice").count(), 1);
        for chunk in &chunks {
            assert!(check_balanced(chunk).is_ok());
        }
    }

    #[test]
    fn test_trailingElementAfterLastVoiceBlock_shouldStayBalanced() {
        let markup = format!(
            "<speak>{}{}<break time=\"500ms\"/></speak>",
            voice_block("a", 50),
            voice_block("b", 50)
        );
        let chunks = MarkupSegmenter::new(100).segment(&markup).unwrap();

        for chunk in &chunks {
            assert!(check_balanced(chunk).is_ok());
        }
        let all = chunks.concat();
        assert!(all.contains("<break time=\"500ms\"/>"));
        assert_eq!(all.matches("</voice>").count(), 2);
    }

    #[test]
    fn test_voiceBlocksNestedInOtherElement_shouldFallBackToSingleChunk() {
        // Splitting at </voice> would strand the prosody wrapper on both
        // sides, so the document must come out whole.
        let markup = format!(
            "<speak><prosody rate=\"slow\">{}{}</prosody></speak>",
            voice_block("a", 80),
            voice_block("b", 80)
        );
        let chunks = MarkupSegmenter::new(100).segment(&markup).unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(check_balanced(&chunks[0]).is_ok());
        assert_eq!(chunks[0].matches("<voice").count(), 2);
    }

    #[test]
    fn test_markupInlineTags_shouldRoundTrip() {
        let markup = "<speak><voice name=\"a\">Hi <emphasis>there</emphasis> \
                      <break time=\"300ms\"/> friend</voice></speak>";
        let chunks = MarkupSegmenter::new(500).segment(markup).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("<emphasis>there</emphasis>"));
        assert!(chunks[0].contains("<break time=\"300ms\"/>"));
    }

    #[test]
    fn test_unbalancedMarkup_shouldError() {
        let markup = "<speak><voice name=\"a\">open only</speak>";
        let result = MarkupSegmenter::new(500).segment(markup);
        assert!(matches!(
            result,
            Err(SegmentationError::MalformedMarkup(_))
        ));
    }

    #[test]
    fn test_checkBalanced_shouldHandleSelfClosing() {
        assert!(check_balanced("<speak><break time=\"1s\"/></speak>").is_ok());
        assert!(check_balanced("<speak><voice></speak></voice>").is_err());
        assert!(check_balanced("<speak>").is_err());
    }

    #[test]
    fn test_documentDetection_shouldPickVariantFromWrapper() {
        let markup = NarrationDocument::from_content("<speak><voice name=\"a\">x</voice></speak>");
        assert_eq!(markup.kind(), SegmentKind::Markup);

        let plain = NarrationDocument::from_content("Just some text.");
        assert_eq!(plain.kind(), SegmentKind::PlainText);
    }

    #[test]
    fn test_segmentDocument_shouldIndexInOrder() {
        let text = (0..10)
            .map(|i| format!("Paragraph number {} with padding content.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let document = NarrationDocument::from_content(text);
        let segments = segment_document(&document, 80).unwrap();

        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index, i);
            assert_eq!(segment.kind, SegmentKind::PlainText);
        }
    }

    #[test]
    fn test_segmentation_shouldBeDeterministic() {
        let text = "One paragraph here.\n\nAnother paragraph there.\n\nA third one.";
        let first = PlainTextSegmenter::new(45).segment(text).unwrap();
        let second = PlainTextSegmenter::new(45).segment(text).unwrap();
        assert_eq!(first, second);
    }
}
