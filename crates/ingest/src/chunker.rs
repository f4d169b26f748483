use anyhow::Result;

use crate::chunk::{Chunk, ChunkingConfig, Page};

/// Splits extracted pages into overlapping token windows, respecting word
/// boundaries. Window text is the window's tokens joined by single spaces.
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Rejects degenerate geometry (`overlap >= size`) before any chunk is
    /// produced.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn chunk_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        let step = self.config.step();
        let mut chunks = Vec::new();

        for page in pages {
            let words: Vec<&str> = page.text.split_whitespace().collect();
            let mut offset = 0;

            while offset < words.len() {
                let end = (offset + self.config.size).min(words.len());
                let text = words[offset..end].join(" ");

                if !text.trim().is_empty() {
                    chunks.push(Chunk::new(page.page, (offset / step) as u32, text));
                }
                offset += step;
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, text: &str) -> Page {
        Page {
            page: number,
            text: text.to_string(),
        }
    }

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn windows_advance_by_step() {
        let chunker = Chunker::new(ChunkingConfig::new(5, 2).unwrap()).unwrap();
        let chunks = chunker.chunk_pages(&[page(1, &words(12))]);

        assert_eq!(chunks[0].id, "1-0");
        assert_eq!(chunks[0].text, "w0 w1 w2 w3 w4");
        assert_eq!(chunks[1].id, "1-1");
        assert_eq!(chunks[1].text, "w3 w4 w5 w6 w7");
        // Final window is short, taking the remaining tokens.
        let last = chunks.last().unwrap();
        assert!(last.text.split_whitespace().count() <= 5);
    }

    #[test]
    fn window_ids_are_unique_and_monotonic_per_page() {
        let chunker = Chunker::new(ChunkingConfig::new(4, 1).unwrap()).unwrap();
        let chunks = chunker.chunk_pages(&[page(1, &words(20)), page(2, &words(9))]);

        let mut seen = std::collections::HashSet::new();
        let mut previous: Option<(u32, u32)> = None;
        for chunk in &chunks {
            assert!(seen.insert(chunk.id.clone()), "duplicate id {}", chunk.id);
            let parsed = Chunk::parse_id(&chunk.id).unwrap();
            if let Some(prev) = previous {
                assert!(parsed > prev, "ids must be insertion-ordered");
            }
            previous = Some(parsed);
        }
    }

    #[test]
    fn leading_window_tokens_reconstruct_the_page() {
        let config = ChunkingConfig::new(5, 2).unwrap();
        let chunker = Chunker::new(config).unwrap();
        let original = words(13);
        let chunks = chunker.chunk_pages(&[page(1, &original)]);

        // The first `step` tokens of every window except the last, plus the
        // whole last window, rebuild the original token stream.
        let mut rebuilt: Vec<String> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let tokens: Vec<&str> = chunk.text.split_whitespace().collect();
            if i + 1 < chunks.len() {
                rebuilt.extend(tokens.iter().take(config.step()).map(|t| t.to_string()));
            } else {
                rebuilt.extend(tokens.iter().map(|t| t.to_string()));
            }
        }
        assert_eq!(rebuilt.join(" "), original);
    }

    #[test]
    fn empty_page_yields_no_chunks() {
        let chunker = Chunker::new(ChunkingConfig::new(5, 2).unwrap()).unwrap();
        assert!(chunker.chunk_pages(&[page(1, "   \n  ")]).is_empty());
    }

    #[test]
    fn degenerate_geometry_is_rejected_before_chunking() {
        assert!(Chunker::new(ChunkingConfig { size: 5, overlap: 5 }).is_err());
        assert!(Chunker::new(ChunkingConfig { size: 5, overlap: 7 }).is_err());
    }
}
