use crate::dom::{Document, MissingElement, NodeId};
use crate::scheduler::TextTarget;

pub const TOO_LONG_MESSAGE: &str = "Comment too long!";

/// What happened to a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submit {
    Accepted(String),
    Prevented,
}

/// Length check for the comment form. Blocks submission while any input
/// holds more than `max_len` chars.
#[derive(Debug)]
pub struct CommentGuard {
    max_len: usize,
    allow_submit: bool,
    warning: NodeId,
    inputs: Vec<NodeId>,
}

impl CommentGuard {
    /// Binds to `strong` #0 for the warning and every `input` on the page.
    pub fn attach(doc: &Document, max_len: usize) -> Result<Self, MissingElement> {
        let warning = doc.require("strong", 0)?;
        let inputs = doc.query_selector_all("input");
        log::debug!("comment guard watching {} input(s)", inputs.len());
        Ok(Self {
            max_len,
            allow_submit: true,
            warning,
            inputs,
        })
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn allow_submit(&self) -> bool {
        self.allow_submit
    }

    /// Re-check after `input` was edited. The warning stays once shown.
    ///
    /// Length is the input's value after the edit, counted in chars
    /// (Unicode scalar values), so an emoji counts once.
    pub fn on_edit(&mut self, doc: &mut Document, input: NodeId) {
        let len = doc.get(input).value.chars().count();
        self.allow_submit = len <= self.max_len;
        if !self.allow_submit {
            log::debug!("comment is {len} chars, limit {}", self.max_len);
            doc.get_mut(self.warning).set_text(TOO_LONG_MESSAGE);
        }
    }

    /// Submit the form. Accepted comments clear their input.
    pub fn submit(&mut self, doc: &mut Document) -> Submit {
        if !self.allow_submit {
            log::warn!("submit prevented: comment over {} chars", self.max_len);
            return Submit::Prevented;
        }
        let text = self
            .inputs
            .iter()
            .map(|&id| std::mem::take(&mut doc.get_mut(id).value))
            .collect::<Vec<_>>()
            .join("\n");
        log::info!("comment submitted ({} chars)", text.chars().count());
        Submit::Accepted(text)
    }
}
