//! Per-task execution environment.
//!
//! The active command directory and its context value are task-local: a
//! background command inherits copies at spawn time, so a directory change
//! inside one task never leaks into another.

use alloc::string::{String, ToString};
use alloc::sync::Arc;

use espshell_term::cprintf;

use crate::keywords::{Directory, KEYWORDS_MAIN};
use crate::shell::Shell;

pub struct Env {
    pub sh: Arc<Shell>,
    /// Active command directory.
    pub dir: &'static Directory,
    /// Arbitrary value carried alongside the directory: the uart number,
    /// the sequence index, the alias pointer.
    pub context: usize,
    /// True inside the main shell task, false in background command tasks.
    pub is_foreground: bool,
}

impl Env {
    pub fn new(sh: Arc<Shell>) -> Self {
        Self {
            sh,
            dir: &KEYWORDS_MAIN,
            context: 0,
            is_foreground: true,
        }
    }

    /// Switch to a new command directory, carrying `context` with it.
    /// `banner` of `Some(text)` prints the standard "entering mode" note.
    /// Returns the directory that was active before.
    pub fn change_directory(
        &mut self,
        context: usize,
        dir: &'static Directory,
        banner: Option<&str>,
    ) -> &'static Directory {
        let old = self.dir;
        self.context = context;
        self.dir = dir;
        if let Some(text) = banner {
            cprintf!(
                self.sh.con,
                "% Entering {} mode. Ctrl+Z or \"exit\" to return\r\n\
                 % Main commands are still available (but not visible in \"?\" command list)\r\n",
                text
            );
        }
        old
    }

    pub fn in_main(&self) -> bool {
        core::ptr::eq(self.dir, &KEYWORDS_MAIN)
    }

    /// Render the active prompt: the directory template with `%u` replaced
    /// by the context number.
    pub fn prompt(&self) -> String {
        let template = self.dir.prompt;
        if template.contains("%u") {
            template.replace("%u", &(self.context as u32).to_string())
        } else {
            String::from(template)
        }
    }
}
