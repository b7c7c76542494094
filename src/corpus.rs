use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

pub const FALLBACK_TEXTS: [&str; 5] = [
    "Natural language processing helps computers understand human language.",
    "Machine learning algorithms learn from data.",
    "Deep learning uses neural networks with many layers.",
    "Python is a popular programming language for AI.",
    "FastAPI makes it easy to build web APIs.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    Missing,
    Empty,
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    File(PathBuf),
    Fallback {
        path: PathBuf,
        reason: FallbackReason,
    },
}

/// Ordered sample texts. Never empty.
#[derive(Debug, Clone)]
pub struct Corpus {
    texts: Vec<String>,
    source: CorpusSource,
}

impl Corpus {
    pub fn fallback(path: &Path, reason: FallbackReason) -> Self {
        Self {
            texts: FALLBACK_TEXTS.iter().map(|t| t.to_string()).collect(),
            source: CorpusSource::Fallback {
                path: path.to_path_buf(),
                reason,
            },
        }
    }

    pub fn source(&self) -> &CorpusSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn first(&self) -> &str {
        self.texts.first().map(String::as_str).unwrap_or_default()
    }

    /// The first `n` texts, or all of them when there are fewer.
    pub fn sample(&self, n: usize) -> &[String] {
        &self.texts[..n.min(self.texts.len())]
    }
}

/// Reads blank-line separated texts from `path`.
///
/// Never fails: a missing, unreadable or empty file yields the built-in
/// sample texts instead, with the reason recorded in [`Corpus::source`].
pub fn load_texts(path: impl AsRef<Path>) -> Corpus {
    let path = path.as_ref();

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return fallback(path, FallbackReason::Missing);
        }
        Err(err) => return fallback(path, FallbackReason::Unreadable(err.to_string())),
    };

    let texts = split_blocks(&contents);
    if texts.is_empty() {
        return fallback(path, FallbackReason::Empty);
    }

    tracing::info!(path = %path.display(), count = texts.len(), "loaded texts from file");

    Corpus {
        texts,
        source: CorpusSource::File(path.to_path_buf()),
    }
}

fn fallback(path: &Path, reason: FallbackReason) -> Corpus {
    tracing::info!(path = %path.display(), reason = %reason, "using built-in sample texts");
    Corpus::fallback(path, reason)
}

/// Splits on blank (or whitespace-only) lines and trims each block.
pub fn split_blocks(contents: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            flush_block(&mut current, &mut blocks);
        } else {
            current.push(line);
        }
    }
    flush_block(&mut current, &mut blocks);

    blocks
}

fn flush_block(current: &mut Vec<&str>, blocks: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }

    let block = current.join("\n").trim().to_string();
    if !block.is_empty() {
        blocks.push(block);
    }
    current.clear();
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Missing => write!(f, "file not found"),
            FallbackReason::Empty => write!(f, "file is empty"),
            FallbackReason::Unreadable(err) => write!(f, "failed to read file: {err}"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::corpus::CorpusSource;
    use crate::corpus::FALLBACK_TEXTS;
    use crate::corpus::FallbackReason;
    use crate::corpus::load_texts;
    use crate::corpus::split_blocks;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_file_falls_back() {
        let corpus = load_texts("definitely/not/here/texts.txt");

        assert_eq!(corpus.texts, FALLBACK_TEXTS);
        assert!(matches!(
            corpus.source(),
            CorpusSource::Fallback {
                reason: FallbackReason::Missing,
                ..
            }
        ));
    }

    #[test]
    fn empty_file_falls_back() {
        let file = file_with(b"");
        let corpus = load_texts(file.path());

        assert_eq!(corpus.len(), 5);
        assert_eq!(corpus.texts, FALLBACK_TEXTS);
        assert!(matches!(
            corpus.source(),
            CorpusSource::Fallback {
                reason: FallbackReason::Empty,
                ..
            }
        ));
    }

    #[test]
    fn whitespace_only_file_falls_back() {
        let file = file_with(b"   \n\n\t\n  \n");
        let corpus = load_texts(file.path());

        assert_eq!(corpus.texts, FALLBACK_TEXTS);
    }

    #[test]
    fn invalid_utf8_falls_back() {
        let file = file_with(&[0xff, 0xfe, 0x00, 0x80]);
        let corpus = load_texts(file.path());

        assert_eq!(corpus.texts, FALLBACK_TEXTS);
        assert!(matches!(
            corpus.source(),
            CorpusSource::Fallback {
                reason: FallbackReason::Unreadable(_),
                ..
            }
        ));
    }

    #[test]
    fn directory_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = load_texts(dir.path());

        assert!(!corpus.is_empty());
        assert_eq!(corpus.texts, FALLBACK_TEXTS);
    }

    #[test]
    fn two_blocks_are_trimmed() {
        let file = file_with(b"  First sample text.  \n\n\tSecond one here.\n\n");
        let corpus = load_texts(file.path());

        assert_eq!(corpus.texts, ["First sample text.", "Second one here."]);
        assert_eq!(corpus.source(), &CorpusSource::File(file.path().to_path_buf()));
    }

    #[test]
    fn multiline_blocks_and_crlf() {
        let blocks = split_blocks("line one\r\nline two\r\n\r\n\r\nthird\r\n   \r\nfourth");

        assert_eq!(blocks, ["line one\nline two", "third", "fourth"]);
    }

    #[test]
    fn sample_is_bounded() {
        let file = file_with(b"a\n\nb");
        let corpus = load_texts(file.path());

        assert_eq!(corpus.sample(3), ["a", "b"]);
        assert_eq!(corpus.first(), "a");
    }
}
