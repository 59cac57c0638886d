#![allow(non_snake_case)]
//! Descriptor builders.
//!
//! Plain functions returning [`Element`] values; none of them touch the
//! runtime. Attributes that only some kinds carry are set through
//! [`ElementExt`], which ignores (and logs) attributes the kind lacks.

use trellis_core::{Callback, Element, ElementKind};

pub use trellis_core::{InputKind, NavLink};

pub fn View(children: impl IntoChildren) -> Element {
    Element::host(ElementKind::View { class: None }).with_children(children.into_children())
}

pub fn Form(on_submit: impl Fn() + 'static, children: impl IntoChildren) -> Element {
    Element::host(ElementKind::Form {
        action: None,
        on_submit: Some(Callback::new(move |()| on_submit())),
    })
    .with_children(children.into_children())
}

pub fn Field(name: impl Into<String>, input: InputKind) -> Element {
    Element::host(ElementKind::Field {
        name: name.into(),
        input,
        value: None,
        placeholder: None,
        on_input: None,
    })
}

pub fn Label(text: impl Into<String>) -> Element {
    Element::host(ElementKind::Label {
        text: text.into(),
        for_field: None,
    })
}

pub fn Divider() -> Element {
    Element::host(ElementKind::Divider)
}

pub fn Navs(links: impl IntoIterator<Item = NavLink>) -> Element {
    Element::host(ElementKind::Navs {
        links: links.into_iter().collect(),
    })
}

/// Unordered by default; see [`ElementExt::ordered`].
pub fn ListItems<I>(items: I) -> Element
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    Element::host(ElementKind::ListItems {
        items: items.into_iter().map(Into::into).collect(),
        ordered: false,
    })
}

pub fn Text(text: impl Into<String>) -> Element {
    Element::text(text)
}

/// Per-kind attribute setters.
pub trait ElementExt: Sized {
    fn class(self, class: impl Into<String>) -> Self;
    fn action(self, url: impl Into<String>) -> Self;
    fn placeholder(self, text: impl Into<String>) -> Self;
    fn value(self, value: impl Into<String>) -> Self;
    fn on_input(self, f: impl Fn(String) + 'static) -> Self;
    fn label_for(self, field: impl Into<String>) -> Self;
    fn ordered(self, ordered: bool) -> Self;
    /// Appends children after the existing ones.
    fn append(self, children: impl IntoChildren) -> Self;
}

fn ignored(attr: &str, el: &Element) {
    log::warn!("`{attr}` does not apply to {el:?}; ignored");
}

macro_rules! set_attr {
    ($el:expr, $attr:literal, $pat:pat => $body:expr) => {{
        let mut el = $el;
        match el.kind_mut() {
            Some($pat) => $body,
            _ => ignored($attr, &el),
        }
        el
    }};
}

impl ElementExt for Element {
    fn class(self, class: impl Into<String>) -> Self {
        set_attr!(self, "class", ElementKind::View { class: c } => *c = Some(class.into()))
    }

    fn action(self, url: impl Into<String>) -> Self {
        set_attr!(self, "action", ElementKind::Form { action, .. } => *action = Some(url.into()))
    }

    fn placeholder(self, text: impl Into<String>) -> Self {
        set_attr!(self, "placeholder", ElementKind::Field { placeholder, .. } => {
            *placeholder = Some(text.into())
        })
    }

    fn value(self, value: impl Into<String>) -> Self {
        set_attr!(self, "value", ElementKind::Field { value: v, .. } => *v = Some(value.into()))
    }

    fn on_input(self, f: impl Fn(String) + 'static) -> Self {
        set_attr!(self, "on_input", ElementKind::Field { on_input, .. } => {
            *on_input = Some(Callback::new(f))
        })
    }

    fn label_for(self, field: impl Into<String>) -> Self {
        set_attr!(self, "label_for", ElementKind::Label { for_field, .. } => {
            *for_field = Some(field.into())
        })
    }

    fn ordered(self, ordered: bool) -> Self {
        set_attr!(self, "ordered", ElementKind::ListItems { ordered: o, .. } => *o = ordered)
    }

    fn append(self, children: impl IntoChildren) -> Self {
        children
            .into_children()
            .into_iter()
            .fold(self, |el, child| el.child(child))
    }
}

pub trait IntoChildren {
    fn into_children(self) -> Vec<Element>;
}

impl IntoChildren for Element {
    fn into_children(self) -> Vec<Element> {
        vec![self]
    }
}

impl IntoChildren for Vec<Element> {
    fn into_children(self) -> Vec<Element> {
        self
    }
}

impl<const N: usize> IntoChildren for [Element; N] {
    fn into_children(self) -> Vec<Element> {
        self.into()
    }
}

impl IntoChildren for Option<Element> {
    fn into_children(self) -> Vec<Element> {
        self.into_iter().collect()
    }
}

impl IntoChildren for () {
    fn into_children(self) -> Vec<Element> {
        Vec::new()
    }
}

macro_rules! impl_into_children_tuple {
    ($($idx:tt $t:ident),+) => {
        impl<$($t: IntoChildren),+> IntoChildren for ($($t,)+) {
            fn into_children(self) -> Vec<Element> {
                let mut v = Vec::new();
                $(v.extend(self.$idx.into_children());)+
                v
            }
        }
    };
}

impl_into_children_tuple!(0 A, 1 B);
impl_into_children_tuple!(0 A, 1 B, 2 C);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;
    use trellis_core::{Hooks, RecordingBackend, Rendered, Runtime, component};

    use super::*;

    fn kind_json(el: &Element) -> serde_json::Value {
        serde_json::to_value(el.kind().expect("host element")).unwrap()
    }

    #[test]
    fn field_carries_its_attributes() {
        let el = Field("email", InputKind::Email)
            .placeholder("you@example.com")
            .value("a@b.c");
        assert_eq!(
            kind_json(&el),
            json!({ "Field": {
                "name": "email",
                "input": "Email",
                "value": "a@b.c",
                "placeholder": "you@example.com"
            }})
        );
    }

    #[test]
    fn attributes_for_other_kinds_are_ignored() {
        let el = Divider().placeholder("nope").class("x");
        assert_eq!(el.kind(), Some(&ElementKind::Divider));

        let text = Text("plain").ordered(true);
        assert!(matches!(text, Element::Text(ref t) if t == "plain"));
    }

    #[test]
    fn view_accepts_tuples_arrays_and_options() {
        let el = View((Label("a"), [Divider(), Divider()], None::<Element>, Text("b")));
        let Element::Host { children, .. } = &el else {
            panic!("expected host element");
        };
        assert_eq!(children.len(), 4);

        let el = View(()).class("empty").append(Some(Text("late")));
        assert_eq!(kind_json(&el), json!({ "View": { "class": "empty" } }));
        assert!(matches!(&el, Element::Host { children, .. } if children.len() == 1));
    }

    #[test]
    fn lists_and_navs() {
        let list = ListItems(["one", "two"]).ordered(true);
        assert_eq!(list.kind().map(ElementKind::tag), Some("ol"));
        assert_eq!(
            kind_json(&list),
            json!({ "ListItems": { "items": ["one", "two"], "ordered": true } })
        );

        let nav = Navs([NavLink::new("Home", "/"), NavLink::new("About", "/about").active(true)]);
        assert_eq!(
            kind_json(&nav),
            json!({ "Navs": { "links": [
                { "label": "Home", "href": "/", "active": false },
                { "label": "About", "href": "/about", "active": true }
            ]}})
        );
    }

    #[test]
    fn handlers_are_callable_and_not_serialized() {
        let submitted = Rc::new(RefCell::new(0));
        let typed = Rc::new(RefCell::new(Vec::new()));
        let form = {
            let submitted = submitted.clone();
            let typed = typed.clone();
            Form(
                move || *submitted.borrow_mut() += 1,
                Field("q", InputKind::Text).on_input(move |s| typed.borrow_mut().push(s)),
            )
            .action("/search")
        };

        let Element::Host { kind, children } = &form else {
            panic!("expected host element");
        };
        let ElementKind::Form {
            on_submit: Some(on_submit),
            ..
        } = kind
        else {
            panic!("expected form");
        };
        on_submit.call(());
        let Some(ElementKind::Field {
            on_input: Some(on_input),
            ..
        }) = children[0].kind()
        else {
            panic!("expected field");
        };
        on_input.call("rust".to_string());

        assert_eq!(*submitted.borrow(), 1);
        assert_eq!(*typed.borrow(), ["rust"]);
        assert_eq!(
            kind_json(&form),
            json!({ "Form": { "action": "/search" } })
        );
    }

    fn login(_: &mut Hooks<'_>, error: &Option<String>) -> Rendered {
        Ok(Form(
            || {},
            (
                Label("Email").label_for("email"),
                Field("email", InputKind::Email),
                Divider(),
                error.clone().map(Text),
            ),
        ))
    }

    #[test]
    fn committed_tree_serializes() {
        let mut rt = Runtime::new(RecordingBackend::new());
        rt.mount(component(login, Some("bad password".to_string())));
        rt.tick().unwrap();

        let tree = serde_json::to_value(rt.committed().unwrap()).unwrap();
        assert_eq!(
            tree["Element"]["children"][0],
            json!({ "Element": {
                "kind": { "Label": { "text": "Email", "for_field": "email" } },
                "children": []
            }})
        );
        assert_eq!(tree["Element"]["children"][3], json!({ "Text": "bad password" }));
        assert_eq!(rt.committed().unwrap().text_content(), "Emailbad password");
    }
}
