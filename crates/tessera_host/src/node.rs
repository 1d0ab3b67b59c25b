//! Candidate trees
//!
//! Render functions return a [`VNode`], a plain value tree with deep
//! equality. Attributes compare as a set, so declaration order does not
//! make two otherwise identical trees differ.
//!
//! ```rust
//! use tessera_host::{h, text};
//!
//! let view = h("button")
//!     .attr("type", "button")
//!     .child(text("Clicked 3 times"));
//! assert_eq!(view.tag, "button");
//! ```

use indexmap::IndexMap;

/// Kind name used for text nodes
pub const TEXT_KIND: &str = "#text";

/// A node in a candidate tree
#[derive(Clone, Debug, PartialEq)]
pub enum VNode {
    Element(VElement),
    Text(String),
}

impl VNode {
    /// Tag name for elements, `#text` for text
    pub fn kind_name(&self) -> &str {
        match self {
            VNode::Element(el) => el.tag.as_str(),
            VNode::Text(_) => TEXT_KIND,
        }
    }

    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VNode::Element(el) => Some(el),
            VNode::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VNode::Text(t) => Some(t.as_str()),
            VNode::Element(_) => None,
        }
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        match self {
            VNode::Element(el) => 1 + el.children.iter().map(VNode::node_count).sum::<usize>(),
            VNode::Text(_) => 1,
        }
    }
}

/// An element in a candidate tree
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub attrs: IndexMap<String, String>,
    pub children: Vec<VNode>,
}

impl VElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Set an attribute only when `enabled`, with an empty value
    pub fn flag(self, name: impl Into<String>, enabled: bool) -> Self {
        if enabled {
            self.attr(name, "")
        } else {
            self
        }
    }

    /// Append a child
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Append a text child
    pub fn text(self, content: impl Into<String>) -> Self {
        self.child(VNode::Text(content.into()))
    }
}

impl From<VElement> for VNode {
    fn from(el: VElement) -> Self {
        VNode::Element(el)
    }
}

impl From<&str> for VNode {
    fn from(content: &str) -> Self {
        VNode::Text(content.to_string())
    }
}

impl From<String> for VNode {
    fn from(content: String) -> Self {
        VNode::Text(content)
    }
}

/// Start an element
pub fn h(tag: impl Into<String>) -> VElement {
    VElement::new(tag)
}

/// A text node
pub fn text(content: impl Into<String>) -> VNode {
    VNode::Text(content.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_order_does_not_affect_equality() {
        let a: VNode = h("input").attr("type", "text").attr("name", "q").into();
        let b: VNode = h("input").attr("name", "q").attr("type", "text").into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_deep_equality_sees_nested_text() {
        let a: VNode = h("ul").child(h("li").text("one")).into();
        let b: VNode = h("ul").child(h("li").text("two")).into();
        assert_ne!(a, b);
        assert_eq!(a.node_count(), 3);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(VNode::from(h("DIV")).kind_name(), "div");
        assert_eq!(text("x").kind_name(), TEXT_KIND);
        assert!(!VNode::from(h("div").flag("hidden", false))
            .as_element()
            .is_some_and(|el| el.attrs.contains_key("hidden")));
    }
}
