use anyhow::{Context, anyhow};
use trellis_core::*;
use trellis_ui::*;

/// Prints every committed tree as an indented outline.
#[derive(Default)]
struct OutlineBackend {
    commits: usize,
}

impl RenderBackend for OutlineBackend {
    fn commit(&mut self, previous: Option<&Descriptor>, next: &Descriptor) {
        self.commits += 1;
        let verb = if previous.is_some() { "update" } else { "mount" };
        log::info!("commit #{} ({verb})", self.commits);
        let mut out = String::new();
        outline(next, 0, &mut out);
        print!("{out}");
    }
}

fn outline(node: &Descriptor, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match node {
        Descriptor::Empty => out.push_str(&format!("{pad}(empty)\n")),
        Descriptor::Text(text) => out.push_str(&format!("{pad}{text:?}\n")),
        Descriptor::Element { kind, children } => {
            let detail = match kind {
                ElementKind::Label { text, .. } => format!(" {text:?}"),
                ElementKind::Field { name, value, .. } => {
                    format!(" {name}={}", value.as_deref().unwrap_or(""))
                }
                ElementKind::ListItems { items, .. } => format!(" {items:?}"),
                ElementKind::Navs { links } => {
                    let labels: Vec<_> = links.iter().map(|l| l.label.as_str()).collect();
                    format!(" {labels:?}")
                }
                _ => String::new(),
            };
            out.push_str(&format!("{pad}<{}>{detail}\n", kind.tag()));
            for child in children {
                outline(child, depth + 1, out);
            }
        }
    }
}

fn app(_: &mut Hooks<'_>, fetcher: &QueuedFetcher) -> Rendered {
    Ok(View((
        Navs([
            NavLink::new("Counter", "/").active(true),
            NavLink::new("Items", "/items"),
        ]),
        component(counter, 1),
        Divider(),
        component(items, fetcher.clone()),
    ))
    .class("app"))
}

fn counter(cx: &mut Hooks<'_>, step: &i32) -> Rendered {
    let (count, set_count) = cx.state(0);
    let step = *step;

    cx.effect_with(count, move || {
        log::info!("count is now {count}");
        Dispose::none()
    });

    Ok(Form(
        move || {
            set_count.update(|c| c + step);
        },
        (
            Label(format!("Clicked {count} times")).label_for("count"),
            Field("count", InputKind::Number).value(count.to_string()),
        ),
    ))
}

fn items(cx: &mut Hooks<'_>, fetcher: &QueuedFetcher) -> Rendered {
    let (items, set_items) = cx.state(Vec::<String>::new());
    let (error, set_error) = cx.state(None::<String>);

    let fetcher = fetcher.clone();
    cx.effect_once(move || {
        fetcher.fetch(
            "/api/items",
            Box::new(move |result: Result<Response, FetchError>| match result {
                Ok(res) if res.is_success() => {
                    set_items.set(res.body.lines().map(str::to_string).collect());
                }
                Ok(res) => {
                    set_error.set(Some(format!("HTTP {}", res.status)));
                }
                Err(err) => {
                    set_error.set(Some(err.to_string()));
                }
            }),
        )
    });

    Ok(View((ListItems(items), error.map(Label))))
}

fn tick<B: RenderBackend>(rt: &mut Runtime<B>) -> anyhow::Result<TickReport> {
    let report = rt.tick().map_err(|e| anyhow!("{e}"))?;
    log::debug!("{report:?}");
    Ok(report)
}

/// Fires the form's submit handler, as a click on its button would.
fn submit<B: RenderBackend>(rt: &Runtime<B>) -> anyhow::Result<()> {
    let form = rt
        .committed()
        .and_then(|tree| {
            tree.find(&|d: &Descriptor| matches!(d.kind(), Some(ElementKind::Form { .. })))
        })
        .context("no form in the committed tree")?;
    if let Some(ElementKind::Form {
        on_submit: Some(on_submit),
        ..
    }) = form.kind()
    {
        on_submit.call(());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let fetcher = QueuedFetcher::new();
    let mut rt = Runtime::new(OutlineBackend::default());
    rt.mount(component(app, fetcher.clone()));
    tick(&mut rt)?;

    // Three clicks before the next tick: one render.
    for _ in 0..3 {
        submit(&rt)?;
    }
    let report = tick(&mut rt)?;
    log::info!("3 clicks -> {} render(s)", report.renders);

    if !fetcher.resolve("/api/items", Ok(Response::ok("apples\npears\nplums"))) {
        log::warn!("no pending request for /api/items");
    }
    tick(&mut rt)?;

    rt.unmount();
    Ok(())
}
