use crate::animation::PresentationTarget;
use crate::scheduler::TextTarget;

/// Index of an element inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A positional lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document has no <{tag}> at index {index}")]
pub struct MissingElement {
    pub tag: &'static str,
    pub index: usize,
}

/// A page element. Only the bits the page scripts touch are modelled.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    /// Inline style, e.g. `opacity:0.5`.
    pub style: String,
    pub inner_html: String,
    /// Current value for form controls.
    pub value: String,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    /// Opacity from the inline style, clamped for display.
    ///
    /// No (or an unparsable) `opacity` declaration reads as fully opaque.
    pub fn opacity(&self) -> f32 {
        self.style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(prop, _)| prop.trim().eq_ignore_ascii_case("opacity"))
            .filter_map(|(_, value)| value.trim().parse::<f32>().ok())
            .last()
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(1.0)
    }
}

impl PresentationTarget for Element {
    fn set_style(&mut self, style: &str) {
        self.style.clear();
        self.style.push_str(style);
    }
}

impl TextTarget for Element {
    fn set_text(&mut self, text: &str) {
        self.inner_html.clear();
        self.inner_html.push_str(text);
    }
}

/// Flat element store in document order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page the scripts run against: fade square, counter, and the
    /// comment form with its warning slot.
    pub fn comment_page() -> Self {
        let mut doc = Self::new();
        doc.append(Element::new("div"));
        doc.append(Element::new("div"));
        doc.append(Element::new("form"));
        doc.append(Element::new("input"));
        doc.append(Element::new("strong"));
        doc
    }

    pub fn append(&mut self, element: Element) -> NodeId {
        self.elements.push(element);
        NodeId(self.elements.len() - 1)
    }

    /// All elements with `tag`, in document order.
    pub fn query_selector_all(&self, tag: &str) -> Vec<NodeId> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.tag.eq_ignore_ascii_case(tag))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// The `index`-th element with `tag`.
    pub fn query_selector(&self, tag: &str, index: usize) -> Option<NodeId> {
        self.query_selector_all(tag).get(index).copied()
    }

    /// Like [`Document::query_selector`], but a miss is an error.
    pub fn require(&self, tag: &'static str, index: usize) -> Result<NodeId, MissingElement> {
        self.query_selector(tag, index)
            .ok_or(MissingElement { tag, index })
    }

    pub fn get(&self, id: NodeId) -> &Element {
        &self.elements[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.elements[id.0]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_lookup() {
        let doc = Document::comment_page();
        let divs = doc.query_selector_all("div");
        assert_eq!(divs.len(), 2);
        assert_eq!(doc.query_selector("div", 1), Some(divs[1]));
        assert_eq!(doc.query_selector("div", 2), None);
        assert!(doc.query_selector("STRONG", 0).is_some());
        assert!(doc.query_selector("span", 0).is_none());
    }

    #[test]
    fn style_write_replaces_previous() {
        let mut el = Element::new("div");
        el.set_style("opacity:0.2");
        el.set_style("opacity:0.3");
        assert_eq!(el.style, "opacity:0.3");
        assert!((el.opacity() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn opacity_parsing() {
        let mut el = Element::new("div");
        assert_eq!(el.opacity(), 1.0);

        el.style = "color: red; opacity: 0.25".to_string();
        assert!((el.opacity() - 0.25).abs() < 1e-6);

        el.style = "opacity:1.0000000000000002".to_string();
        assert_eq!(el.opacity(), 1.0);

        el.style = "opacity:-3".to_string();
        assert_eq!(el.opacity(), 0.0);

        el.style = "opacity:abc".to_string();
        assert_eq!(el.opacity(), 1.0);
    }

    #[test]
    fn require_reports_tag_and_index() {
        let doc = Document::comment_page();
        assert!(doc.require("input", 0).is_ok());
        let err = doc.require("input", 3).unwrap_err();
        assert_eq!(err, MissingElement { tag: "input", index: 3 });
        assert_eq!(err.to_string(), "document has no <input> at index 3");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn text_target_sets_inner_html() {
        let mut doc = Document::comment_page();
        let out = doc.query_selector("div", 1).unwrap();
        doc.get_mut(out).set_text("count: 3");
        assert_eq!(doc.get(out).inner_html, "count: 3");
        assert_eq!(doc.len(), 5);
    }
}
