use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::rc::Rc;

use crate::error::BoxError;
use crate::hooks::Hooks;

/// What a component body returns.
pub type Rendered = Result<Element, BoxError>;

pub(crate) type RenderFn = Rc<dyn Fn(&mut Hooks<'_>, &(dyn Any + 'static)) -> Rendered>;

/// Event handler stored in a descriptor. Compares by identity.
pub struct Callback<A = ()>(Rc<dyn Fn(A)>);

impl<A> Callback<A> {
    pub fn new(f: impl Fn(A) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, arg: A) {
        (self.0)(arg)
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A> PartialEq for Callback<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<callback>")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum InputKind {
    #[default]
    Text,
    Password,
    Email,
    Number,
    Checkbox,
    TextArea,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub active: bool,
}

impl NavLink {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            active: false,
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Closed set of host element kinds, each with a fixed field set.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ElementKind {
    View {
        class: Option<String>,
    },
    Form {
        action: Option<String>,
        #[cfg_attr(feature = "serde", serde(skip))]
        on_submit: Option<Callback>,
    },
    Field {
        name: String,
        input: InputKind,
        value: Option<String>,
        placeholder: Option<String>,
        #[cfg_attr(feature = "serde", serde(skip))]
        on_input: Option<Callback<String>>,
    },
    Label {
        text: String,
        for_field: Option<String>,
    },
    Divider,
    Navs {
        links: Vec<NavLink>,
    },
    ListItems {
        items: Vec<String>,
        ordered: bool,
    },
}

impl ElementKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ElementKind::View { .. } => "div",
            ElementKind::Form { .. } => "form",
            ElementKind::Field {
                input: InputKind::TextArea,
                ..
            } => "textarea",
            ElementKind::Field { .. } => "input",
            ElementKind::Label { .. } => "label",
            ElementKind::Divider => "hr",
            ElementKind::Navs { .. } => "nav",
            ElementKind::ListItems { ordered: true, .. } => "ol",
            ElementKind::ListItems { .. } => "ul",
        }
    }
}

/// A component call inside an element tree.
#[derive(Clone)]
pub struct ComponentNode {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) key: Option<String>,
    pub(crate) render: RenderFn,
    pub(crate) props: Rc<dyn Any>,
}

impl ComponentNode {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

/// Output of a component body: host elements, text, and nested component calls.
#[derive(Clone, Debug, Default)]
pub enum Element {
    #[default]
    Empty,
    Text(String),
    Host {
        kind: ElementKind,
        children: Vec<Element>,
    },
    Component(ComponentNode),
}

impl Element {
    pub fn host(kind: ElementKind) -> Self {
        Element::Host {
            kind,
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Element::Text(text.into())
    }

    /// Replaces the children of a host element. Other elements have no
    /// children; the call is ignored for them.
    pub fn with_children(mut self, kids: Vec<Element>) -> Self {
        match &mut self {
            Element::Host { children, .. } => *children = kids,
            other => log::warn!("with_children on {other:?} ignored"),
        }
        self
    }

    pub fn child(mut self, kid: impl Into<Element>) -> Self {
        match &mut self {
            Element::Host { children, .. } => children.push(kid.into()),
            other => log::warn!("child on {other:?} ignored"),
        }
        self
    }

    pub fn kind(&self) -> Option<&ElementKind> {
        match self {
            Element::Host { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn kind_mut(&mut self) -> Option<&mut ElementKind> {
        match self {
            Element::Host { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::text(text)
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::Text(text)
    }
}

impl From<ComponentNode> for Element {
    fn from(node: ComponentNode) -> Self {
        Element::Component(node)
    }
}

// Pins the closure to the higher-ranked signature `RenderFn` needs.
fn render_fn<F>(f: F) -> F
where
    F: Fn(&mut Hooks<'_>, &(dyn Any + 'static)) -> Rendered,
{
    f
}

fn short_name<F>() -> &'static str {
    let full = type_name::<F>();
    full.rsplit("::").next().unwrap_or(full)
}

pub(crate) fn node<P, F>(key: Option<String>, f: F, props: P) -> ComponentNode
where
    P: 'static,
    F: Fn(&mut Hooks<'_>, &P) -> Rendered + 'static,
{
    let name = short_name::<F>();
    let render = render_fn(move |cx, props| match props.downcast_ref::<P>() {
        Some(props) => f(cx, props),
        None => Err(format!("`{name}` received props of the wrong type").into()),
    });
    ComponentNode {
        name,
        type_id: TypeId::of::<F>(),
        key,
        render: Rc::new(render),
        props: Rc::new(props),
    }
}

/// A call of component function `f` with `props`.
///
/// Instances are identified by the function (each `fn` item has its own type)
/// and by position within the parent's output.
pub fn component<P, F>(f: F, props: P) -> Element
where
    P: 'static,
    F: Fn(&mut Hooks<'_>, &P) -> Rendered + 'static,
{
    Element::Component(node(None, f, props))
}

/// Like [`component`], but identified by `key` instead of position, so the
/// instance survives reordering among its siblings.
pub fn keyed<P, F>(key: impl Into<String>, f: F, props: P) -> Element
where
    P: 'static,
    F: Fn(&mut Hooks<'_>, &P) -> Rendered + 'static,
{
    Element::Component(node(Some(key.into()), f, props))
}

/// Resolved, host-only tree handed to the renderer.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Descriptor {
    #[default]
    Empty,
    Text(String),
    Element {
        kind: ElementKind,
        children: Vec<Descriptor>,
    },
}

impl Descriptor {
    pub fn kind(&self) -> Option<&ElementKind> {
        match self {
            Descriptor::Element { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Descriptor] {
        match self {
            Descriptor::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated text of the subtree, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Descriptor::Empty => {}
            Descriptor::Text(t) => out.push_str(t),
            Descriptor::Element { kind, children } => {
                match kind {
                    ElementKind::Label { text, .. } => out.push_str(text),
                    ElementKind::ListItems { items, .. } => out.push_str(&items.join(",")),
                    _ => {}
                }
                for c in children {
                    c.collect_text(out);
                }
            }
        }
    }

    /// First node, in pre-order, matching `pred`.
    pub fn find(&self, pred: &dyn Fn(&Descriptor) -> bool) -> Option<&Descriptor> {
        if pred(self) {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(pred))
    }
}
