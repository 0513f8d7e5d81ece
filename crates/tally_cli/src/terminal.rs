//! Terminal label board
//!
//! Each counting label owns one line of the board. Labels only record what
//! they were told to show; the main loop redraws the board after each tick.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tally_animation::{Color, FontWeight, LabelSink, RichText};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const CLEAR_LINE: &str = "\x1b[2K";

#[derive(Clone, Debug, Default)]
struct Line {
    title: String,
    text: RichText,
    color: Option<Color>,
}

/// Lines of counting labels, redrawn in place
#[derive(Debug, Default)]
pub struct Board {
    lines: Mutex<Vec<Line>>,
    dirty: AtomicBool,
    /// Lines printed by the previous draw
    drawn: Mutex<usize>,
}

impl Board {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lines(&self) -> MutexGuard<'_, Vec<Line>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a line and return the label that writes into it
    pub fn add_label(self: &Arc<Self>, title: &str) -> BoardLabel {
        let mut lines = self.lines();
        lines.push(Line {
            title: title.to_string(),
            ..Default::default()
        });
        BoardLabel {
            board: Arc::clone(self),
            index: lines.len() - 1,
        }
    }

    fn update(&self, index: usize, f: impl FnOnce(&mut Line)) {
        if let Some(line) = self.lines().get_mut(index) {
            f(line);
            self.dirty.store(true, Ordering::Release);
        }
    }

    /// Plain text of every line
    pub fn snapshot(&self) -> Vec<String> {
        self.lines().iter().map(|l| l.text.plain_text()).collect()
    }

    /// Redraw if anything changed since the last draw
    pub fn draw_if_dirty(&self, out: &mut impl Write, ansi: bool) -> io::Result<()> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            self.draw(out, ansi)?;
        }
        Ok(())
    }

    /// Draw every line, overwriting the previous draw when `ansi` is set
    pub fn draw(&self, out: &mut impl Write, ansi: bool) -> io::Result<()> {
        let lines = self.lines().clone();
        let mut drawn = self.drawn.lock().unwrap_or_else(PoisonError::into_inner);

        if ansi && *drawn > 0 {
            write!(out, "\x1b[{}A", *drawn)?;
        }

        let width = lines.iter().map(|l| l.title.len()).max().unwrap_or(0);
        for line in &lines {
            if ansi {
                write!(out, "{CLEAR_LINE}{:>width$}  ", line.title)?;
                write_styled(out, &line.text, line.color)?;
                writeln!(out, "{RESET}")?;
            } else {
                writeln!(out, "{:>width$}  {}", line.title, line.text.plain_text())?;
            }
        }
        out.flush()?;

        *drawn = lines.len();
        Ok(())
    }
}

fn write_styled(out: &mut impl Write, text: &RichText, color: Option<Color>) -> io::Result<()> {
    for span in text.spans() {
        if let Some(color) = span.style.color.or(color) {
            let [r, g, b] = color.to_rgb8();
            write!(out, "\x1b[38;2;{r};{g};{b}m")?;
        }
        if matches!(span.style.weight, FontWeight::Bold | FontWeight::Black) {
            write!(out, "{BOLD}")?;
        }
        write!(out, "{}{RESET}", span.text)?;
    }
    Ok(())
}

/// One line of a [`Board`]
#[derive(Clone)]
pub struct BoardLabel {
    board: Arc<Board>,
    index: usize,
}

impl LabelSink for BoardLabel {
    fn set_text(&self, text: &str) {
        self.update_text(RichText::from(text));
    }

    fn set_rich_text(&self, text: &RichText) {
        self.update_text(text.clone());
    }

    fn set_color(&self, color: Color) {
        self.board.update(self.index, |line| line.color = Some(color));
    }
}

impl BoardLabel {
    fn update_text(&self, text: RichText) {
        self.board.update(self.index, |line| line.text = text);
    }
}
