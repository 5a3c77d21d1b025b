use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chat_provider::{ContentBlock, TurnWarning};

/// Ordered sink for everything the client shows the user.
///
/// The decode core never touches this directly; the app forwards each block
/// at its arrival position so replies render progressively.
pub trait BlockSink: Send {
    fn block(&mut self, block: &ContentBlock);
    fn warning(&mut self, warning: &TurnWarning);
    fn notice(&mut self, text: &str);
    fn error(&mut self, text: &str);
}

/// Plain terminal sink: markdown text is printed verbatim, image blocks are
/// written to files and referenced by path.
pub struct TerminalSink {
    image_dir: PathBuf,
    images_written: usize,
}

impl TerminalSink {
    #[must_use]
    pub fn new(image_dir: PathBuf) -> Self {
        Self {
            image_dir,
            images_written: 0,
        }
    }

    fn save_image(&mut self, content: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.image_dir)?;
        let path = self
            .image_dir
            .join(format!("image-{:03}.png", self.images_written + 1));
        fs::write(&path, content)?;
        self.images_written += 1;
        Ok(path)
    }
}

impl BlockSink for TerminalSink {
    fn block(&mut self, block: &ContentBlock) {
        match block {
            ContentBlock::Text { content } => {
                println!("{content}");
            }
            ContentBlock::Image { content, alt_text } => match self.save_image(content) {
                Ok(path) => println!("![{alt_text}]({})", path.display()),
                Err(error) => self.error(&format!("could not save image block: {error}")),
            },
        }
        let _ = io::stdout().flush();
    }

    fn warning(&mut self, warning: &TurnWarning) {
        eprintln!("warning: {warning}");
    }

    fn notice(&mut self, text: &str) {
        println!("{text}");
    }

    fn error(&mut self, text: &str) {
        eprintln!("error: {text}");
    }
}
