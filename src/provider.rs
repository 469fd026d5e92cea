//! The value-provider boundary.
//!
//! A [`ValueProvider`] receives one request per resolution pass as a
//! [`Form`]: the request's [`CellTree`] plus write access to its cells. It
//! edits cells through [`Form::update`] (which validates) and reports how the
//! round ended. Looping until every field validates is the provider's job.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use toml::Table;
use tracing::debug;

use crate::cell::Cell;
use crate::kinds::CellKind;
use crate::store::{CellId, CellStore};
use crate::tree::{CellTree, resolve_tree};
use crate::value::Slot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Cells hold the answers.
    Answered,
    Cancelled,
    /// The request could not be shown at all.
    RenderingFailed(String),
}

pub trait ValueProvider {
    fn request(&mut self, form: &mut Form<'_>, title: &str) -> RequestOutcome;
}

impl<P: ValueProvider + ?Sized> ValueProvider for &mut P {
    fn request(&mut self, form: &mut Form<'_>, title: &str) -> RequestOutcome {
        (**self).request(form, title)
    }
}

impl<P: ValueProvider + ?Sized> ValueProvider for Box<P> {
    fn request(&mut self, form: &mut Form<'_>, title: &str) -> RequestOutcome {
        (**self).request(form, title)
    }
}

/// Mutable view over a request.
pub struct Form<'a> {
    tree: &'a CellTree,
    store: &'a mut CellStore,
}

impl<'a> Form<'a> {
    pub fn new(tree: &'a CellTree, store: &'a mut CellStore) -> Self {
        Self { tree, store }
    }

    pub fn tree(&self) -> &CellTree {
        self.tree
    }

    /// Request cells with their dotted paths, in display order.
    pub fn fields(&self) -> Vec<(String, CellId)> {
        self.tree.leaves()
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        self.store.cell(id)
    }

    pub fn update(&mut self, id: CellId, raw: impl Into<Slot>) -> bool {
        self.store.update(id, raw)
    }

    pub fn toggle_visibility(&mut self, id: CellId) -> bool {
        self.store.toggle_visibility(id)
    }

    /// A request cell by dotted path or by label.
    pub fn find(&self, key: &str) -> Option<CellId> {
        self.tree.cell_at(key).or_else(|| {
            self.fields()
                .into_iter()
                .find(|(_, id)| self.store.cell(*id).label() == Some(key))
                .map(|(_, id)| id)
        })
    }

    /// Current values as a nested table shaped like the request.
    pub fn values(&self) -> Table {
        resolve_tree(&*self.store, self.tree)
    }

    /// Every request cell holds an accepted value.
    pub fn is_complete(&self) -> bool {
        self.fields()
            .iter()
            .all(|(_, id)| self.store.cell(*id).is_accepted())
    }
}

/// What a [`ScriptedProvider`] saw in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub title: String,
    /// `(path, label)` per request cell.
    pub fields: Vec<(String, String)>,
    /// Options of selection cells, by path.
    pub options: Vec<(String, Vec<String>)>,
}

impl RecordedRequest {
    pub fn paths(&self) -> Vec<&str> {
        self.fields.iter().map(|(p, _)| p.as_str()).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.fields.iter().map(|(_, l)| l.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
enum Step {
    Answer(Vec<(String, Slot)>),
    Cancel,
    Fail(String),
}

/// Answers requests from a queue, one step per request.
///
/// Keys name a cell by path or label. Keys that match nothing are skipped.
/// Once the queue runs dry every request fails to render.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    steps: VecDeque<Step>,
    requests: Vec<RecordedRequest>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one round of answers.
    pub fn answer<I, K, V>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Slot>,
    {
        let answers = answers.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.steps.push_back(Step::Answer(answers));
        self
    }

    /// Queue a round answered from a JSON object.
    pub fn answer_json(self, answers: serde_json::Value) -> Self {
        let pairs: Vec<(String, Slot)> = match answers {
            serde_json::Value::Object(map) => map.into_iter().map(|(k, v)| (k, Slot::from(v))).collect(),
            _ => Vec::new(),
        };
        self.answer(pairs)
    }

    pub fn cancel(mut self) -> Self {
        self.steps.push_back(Step::Cancel);
        self
    }

    pub fn fail(mut self, diagnostic: impl Into<String>) -> Self {
        self.steps.push_back(Step::Fail(diagnostic.into()));
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> &[RecordedRequest] {
        &self.requests
    }

    fn record(&mut self, form: &Form<'_>, title: &str) {
        let mut fields = Vec::new();
        let mut options = Vec::new();
        for (path, id) in form.fields() {
            let cell = form.cell(id);
            fields.push((path.clone(), cell.label().unwrap_or(&path).to_string()));
            if let CellKind::Select(spec) = cell.kind() {
                options.push((path, spec.options.iter().map(|o| o.label.clone()).collect()));
            }
        }
        self.requests.push(RecordedRequest {
            title: title.to_string(),
            fields,
            options,
        });
    }
}

impl ValueProvider for ScriptedProvider {
    fn request(&mut self, form: &mut Form<'_>, title: &str) -> RequestOutcome {
        self.record(form, title);
        match self.steps.pop_front() {
            Some(Step::Answer(answers)) => {
                for (key, value) in answers {
                    match form.find(&key) {
                        Some(id) => {
                            form.update(id, value);
                        }
                        None => debug!(key, "scripted answer matches no request field"),
                    }
                }
                RequestOutcome::Answered
            }
            Some(Step::Cancel) => RequestOutcome::Cancelled,
            Some(Step::Fail(diagnostic)) => RequestOutcome::RenderingFailed(diagnostic),
            None => RequestOutcome::RenderingFailed("no scripted answers left".into()),
        }
    }
}

/// A line-oriented terminal front end.
///
/// Prompts for every cell that does not yet hold an accepted value, one line
/// each. An empty line keeps the current value or takes the suggestion left
/// by a failed attempt. Selections also take an option number. `:show`
/// toggles a secret's visibility; `:q` or end of input cancels.
pub struct TextProvider<R, W> {
    input: R,
    output: W,
}

impl TextProvider<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

enum Line {
    Text(String),
    Cancel,
}

impl<R: BufRead, W: Write> TextProvider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn run(&mut self, form: &mut Form<'_>, title: &str) -> io::Result<RequestOutcome> {
        writeln!(self.output, "{title}")?;
        for (path, id) in form.fields() {
            while !form.cell(id).is_accepted() {
                self.show(form.cell(id), &path)?;
                let raw = match self.read_line()? {
                    Line::Cancel => return Ok(RequestOutcome::Cancelled),
                    Line::Text(text) if text == ":show" => {
                        form.toggle_visibility(id);
                        continue;
                    }
                    Line::Text(text) => self.interpret(form.cell(id), text),
                };
                if !form.update(id, raw) {
                    let error = form.cell(id).error().unwrap_or("invalid value").to_string();
                    writeln!(self.output, "  ! {error}")?;
                }
            }
        }
        Ok(RequestOutcome::Answered)
    }

    fn show(&mut self, cell: &Cell, path: &str) -> io::Result<()> {
        let label = cell.label().unwrap_or(path);
        if let Some(description) = cell.description() {
            writeln!(self.output, "  {description}")?;
        }
        if let CellKind::Select(spec) = cell.kind() {
            for (n, option) in spec.options.iter().enumerate() {
                let tip = if option.tip { " *" } else { "" };
                match &option.description {
                    Some(d) => writeln!(self.output, "  {}) {} - {d}{tip}", n + 1, option.label)?,
                    None => writeln!(self.output, "  {}) {}{tip}", n + 1, option.label)?,
                }
            }
        }
        let current = match cell.suggestion() {
            Some(suggestion) => suggestion.to_string(),
            None => cell.display(),
        };
        if current.is_empty() {
            write!(self.output, "{label}: ")?;
        } else {
            write!(self.output, "{label} [{current}]: ")?;
        }
        self.output.flush()
    }

    fn read_line(&mut self) -> io::Result<Line> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Line::Cancel);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if line == ":q" {
            return Ok(Line::Cancel);
        }
        Ok(Line::Text(line))
    }

    fn interpret(&self, cell: &Cell, text: String) -> Slot {
        if text.is_empty() {
            if let Some(suggestion) = cell.suggestion() {
                return suggestion.clone();
            }
            if matches!(cell.value(), Slot::Filled(_)) {
                return cell.value().clone();
            }
        }
        if let CellKind::Select(spec) = cell.kind()
            && let Ok(n) = text.trim().parse::<usize>()
            && let Some(option) = n.checked_sub(1).and_then(|i| spec.options.get(i))
        {
            return Slot::from(option.label.clone());
        }
        Slot::from(text)
    }
}

impl<R: BufRead, W: Write> ValueProvider for TextProvider<R, W> {
    fn request(&mut self, form: &mut Form<'_>, title: &str) -> RequestOutcome {
        match self.run(form, title) {
            Ok(outcome) => outcome,
            Err(e) => RequestOutcome::RenderingFailed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::required;
    use crate::kinds::{SecretSpec, SelectSpec};
    use crate::tree::Node;
    use crate::value::TypeTag;
    use std::io::Cursor;

    #[test]
    fn form_values_mirror_the_request() {
        let mut store = CellStore::new();
        let tree = request_of(
            &mut store,
            vec![("db.url", Cell::new(TypeTag::Str)), ("port", Cell::new(TypeTag::Int))],
        );
        let mut form = Form::new(&tree, &mut store);
        let port = form.find("port").unwrap();
        assert!(form.update(port, "80"));

        let values = form.values();
        assert_eq!(values["port"].as_integer(), Some(80));
        assert!(values["db"].as_table().unwrap().is_empty());
    }

    fn request_of(store: &mut CellStore, cells: Vec<(&str, Cell)>) -> CellTree {
        let mut tree = CellTree::new();
        for (path, cell) in cells {
            let id = store.insert(cell);
            tree.insert_path(path, Node::Cell(id));
        }
        tree
    }

    fn text_provider(input: &str) -> TextProvider<Cursor<Vec<u8>>, Vec<u8>> {
        TextProvider::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn scripted_answers_by_path_and_label() {
        let mut store = CellStore::new();
        let tree = request_of(
            &mut store,
            vec![
                ("db.url", Cell::new(TypeTag::Str).with_label("url")),
                ("age", Cell::new(TypeTag::Int).with_label("Age")),
            ],
        );
        let mut provider = ScriptedProvider::new().answer([("db.url", Slot::from("pg://")), ("Age", Slot::from("3"))]);
        let mut form = Form::new(&tree, &mut store);
        assert_eq!(provider.request(&mut form, "Missing"), RequestOutcome::Answered);
        assert!(form.is_complete());
        assert_eq!(store.cell(tree.cell_at("age").unwrap()).value(), &Slot::from(3));

        let recorded = &provider.requests()[0];
        assert_eq!(recorded.title, "Missing");
        assert_eq!(recorded.paths(), vec!["db.url", "age"]);
        assert_eq!(recorded.labels(), vec!["url", "Age"]);
    }

    #[test]
    fn scripted_json_answers() {
        let mut store = CellStore::new();
        let tree = request_of(&mut store, vec![("n", Cell::new(TypeTag::Int))]);
        let mut provider = ScriptedProvider::new().answer_json(serde_json::json!({"n": 7}));
        provider.request(&mut Form::new(&tree, &mut store), "t");
        assert_eq!(store.cell(tree.cell_at("n").unwrap()).value(), &Slot::from(7));
    }

    #[test]
    fn scripted_cancel_fail_and_exhaustion() {
        let mut store = CellStore::new();
        let tree = request_of(&mut store, vec![("n", Cell::new(TypeTag::Int))]);
        let mut provider = ScriptedProvider::new().cancel().fail("no terminal");
        let mut form = Form::new(&tree, &mut store);
        assert_eq!(provider.request(&mut form, "t"), RequestOutcome::Cancelled);
        assert_eq!(
            provider.request(&mut form, "t"),
            RequestOutcome::RenderingFailed("no terminal".into())
        );
        assert!(matches!(
            provider.request(&mut form, "t"),
            RequestOutcome::RenderingFailed(_)
        ));
        assert_eq!(provider.requests().len(), 3);
    }

    #[test]
    fn text_provider_reprompts_until_valid() {
        let mut store = CellStore::new();
        let tree = request_of(
            &mut store,
            vec![("age", Cell::new(TypeTag::Int).with_label("age").with_description("Years."))],
        );
        let mut provider = text_provider("old\n42\n");
        let outcome = provider.request(&mut Form::new(&tree, &mut store), "Please answer");
        assert_eq!(outcome, RequestOutcome::Answered);
        assert_eq!(store.cell(tree.cell_at("age").unwrap()).value(), &Slot::from(42));

        let out = String::from_utf8(provider.into_output()).unwrap();
        assert!(out.starts_with("Please answer\n"));
        assert!(out.contains("Years."));
        assert!(out.contains("! expected int"));
    }

    #[test]
    fn text_provider_numbered_options() {
        let mut store = CellStore::new();
        let spec = SelectSpec::from_labels(["Build", "Deploy"]);
        let tree = request_of(&mut store, vec![("command", Cell::select(spec).with_validator(required()))]);
        let mut provider = text_provider("2\n");
        provider.request(&mut Form::new(&tree, &mut store), "Choose");
        assert_eq!(
            store.cell(tree.cell_at("command").unwrap()).value(),
            &Slot::from("Deploy")
        );
        let out = String::from_utf8(provider.into_output()).unwrap();
        assert!(out.contains("1) Build"));
        assert!(out.contains("2) Deploy"));
    }

    #[test]
    fn text_provider_eof_and_quit_cancel() {
        let mut store = CellStore::new();
        let tree = request_of(&mut store, vec![("n", Cell::new(TypeTag::Int))]);
        let mut provider = text_provider("");
        assert_eq!(
            provider.request(&mut Form::new(&tree, &mut store), "t"),
            RequestOutcome::Cancelled
        );
        let mut provider = text_provider(":q\n");
        assert_eq!(
            provider.request(&mut Form::new(&tree, &mut store), "t"),
            RequestOutcome::Cancelled
        );
    }

    #[test]
    fn text_provider_takes_suggestion_on_empty_line() {
        let mut store = CellStore::new();
        let cell = Cell::new(TypeTag::Int).with_validator(crate::check::range(None, Some(10.0)));
        let tree = request_of(&mut store, vec![("n", cell)]);
        let mut provider = text_provider("50\n\n");
        provider.request(&mut Form::new(&tree, &mut store), "t");
        assert_eq!(store.cell(tree.cell_at("n").unwrap()).value(), &Slot::from(10));
    }

    #[test]
    fn text_provider_masks_secrets_until_shown() {
        let mut store = CellStore::new();
        let cell = Cell::new(TypeTag::Str)
            .with_kind(CellKind::Secret(SecretSpec::default()))
            .with_validator(required());
        let tree = request_of(&mut store, vec![("token", cell)]);
        let mut provider = text_provider("abc\n");
        provider.request(&mut Form::new(&tree, &mut store), "t");
        let id = tree.cell_at("token").unwrap();
        assert_eq!(store.cell(id).value(), &Slot::from("abc"));
        assert_eq!(store.cell(id).display(), "•••");
    }
}
