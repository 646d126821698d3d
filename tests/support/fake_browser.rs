//! Scripted in-memory browser for traversal tests.
//!
//! Pages are small node trees keyed by URL. Every tab shows the page of its
//! URL; element references carry the tab handle, the tab's navigation
//! generation and the child-index path to the node, so they go stale when
//! the tab navigates. Ctrl-click opens a new tab at the element's `href`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use harvester_core::{Browser, BrowserError, ContextHandle, Locator};

/// One element of a scripted page.
#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: String,
    classes: Vec<String>,
    attrs: HashMap<String, String>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    /// Adds whitespace-separated class tokens.
    pub fn class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn rendered_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(self.text.clone());
        }
        for child in &self.children {
            let text = child.rendered_text();
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }
}

/// Reference to a node of one tab's document at one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement {
    tab: String,
    generation: u64,
    path: Vec<usize>,
}

#[derive(Debug)]
struct Tab {
    handle: String,
    url: String,
    generation: u64,
}

#[derive(Debug, Default)]
struct State {
    pages: HashMap<String, Node>,
    tabs: Vec<Tab>,
    active: Option<String>,
    next_tab: usize,
    opened: usize,
    max_open: usize,
    cookies: HashMap<String, String>,
    typed: HashMap<String, String>,
    accepted_login: Option<(String, String)>,
    stale_scopes: HashMap<String, usize>,
    block_new_tabs: bool,
    failing_switches: usize,
    quit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Tag(String),
    Class(String),
    Id(String),
}

impl Simple {
    fn parse(token: &str) -> Self {
        if let Some(class) = token.strip_prefix('.') {
            Self::Class(class.to_string())
        } else if let Some(id) = token.strip_prefix('#') {
            Self::Id(id.to_string())
        } else {
            Self::Tag(token.to_string())
        }
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Tag(tag) => node.tag == *tag,
            Self::Class(class) => node.has_class(class),
            Self::Id(id) => node.attrs.get("id") == Some(id),
        }
    }
}

/// Selector list; each entry is a descendant chain, outermost first.
fn parse_locator(locator: Locator) -> Vec<Vec<Simple>> {
    match locator {
        Locator::Class(class) => vec![vec![Simple::Class(class.to_string())]],
        Locator::Tag(tag) => vec![vec![Simple::Tag(tag.to_string())]],
        Locator::Id(id) => vec![vec![Simple::Id(id.to_string())]],
        Locator::Css(selector) => selector
            .split(',')
            .map(|part| part.split_whitespace().map(Simple::parse).collect())
            .collect(),
    }
}

fn chain_matches(chain: &[Simple], node: &Node, ancestors: &[&Node]) -> bool {
    let Some((last, rest)) = chain.split_last() else {
        return false;
    };
    if !last.matches(node) {
        return false;
    }
    let mut remaining = rest;
    for ancestor in ancestors.iter().rev() {
        let Some((next, before)) = remaining.split_last() else {
            break;
        };
        if next.matches(ancestor) {
            remaining = before;
        }
    }
    remaining.is_empty()
}

fn collect<'n>(
    node: &'n Node,
    path: &mut Vec<usize>,
    ancestors: &mut Vec<&'n Node>,
    selectors: &[Vec<Simple>],
    out: &mut Vec<Vec<usize>>,
) {
    ancestors.push(node);
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        if selectors
            .iter()
            .any(|chain| chain_matches(chain, child, ancestors.as_slice()))
        {
            out.push(path.clone());
        }
        collect(child, path, ancestors, selectors, out);
        path.pop();
    }
    ancestors.pop();
}

static BLANK: std::sync::LazyLock<Node> = std::sync::LazyLock::new(|| Node::new("html"));

impl State {
    fn tab(&self, handle: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.handle == handle)
    }

    fn active_tab(&self) -> Result<&Tab, BrowserError> {
        let handle = self
            .active
            .as_deref()
            .ok_or_else(|| BrowserError::driver("no active browsing context"))?;
        self.tab(handle)
            .ok_or_else(|| BrowserError::no_such_context(ContextHandle::new(handle)))
    }

    fn page(&self, url: &str) -> &Node {
        self.pages.get(url).unwrap_or(&*BLANK)
    }

    /// Resolves `element` to its node and the chain of its ancestors.
    fn resolve(&self, element: &FakeElement) -> Result<(&Node, Vec<&Node>), BrowserError> {
        let active = self.active_tab()?;
        if active.handle != element.tab || active.generation != element.generation {
            return Err(BrowserError::StaleReference);
        }
        let mut node = self.page(&active.url);
        let mut ancestors = Vec::new();
        for &index in &element.path {
            ancestors.push(node);
            node = node.children.get(index).ok_or(BrowserError::StaleReference)?;
        }
        Ok((node, ancestors))
    }
}

/// In-memory [`Browser`] implementation.
#[derive(Debug)]
pub struct FakeBrowser {
    state: Mutex<State>,
}

impl FakeBrowser {
    /// Starts with one tab showing `start_url`.
    pub fn new(start_url: &str, pages: impl IntoIterator<Item = (String, Node)>) -> Self {
        let state = State {
            pages: pages.into_iter().collect(),
            tabs: vec![Tab {
                handle: "tab-0".to_string(),
                url: start_url.to_string(),
                generation: 0,
            }],
            active: Some("tab-0".to_string()),
            next_tab: 1,
            max_open: 1,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake browser state poisoned")
    }

    pub fn set_cookie(&self, name: &str, value: &str) {
        self.lock().cookies.insert(name.to_string(), value.to_string());
    }

    /// Only these credentials make the login button navigate.
    pub fn accept_login(&self, username: &str, password: &str) {
        self.lock().accepted_login = Some((username.to_string(), password.to_string()));
    }

    /// The next `times` scoped queries under an element with `class`
    /// fail as stale.
    pub fn go_stale_under(&self, class: &str, times: usize) {
        self.lock().stale_scopes.insert(class.to_string(), times);
    }

    /// Ctrl-click no longer opens tabs.
    pub fn block_new_tabs(&self) {
        self.lock().block_new_tabs = true;
    }

    /// The next `times` switches to a tab fail with a driver error.
    pub fn fail_switches(&self, times: usize) {
        self.lock().failing_switches = times;
    }

    pub fn open_tab_count(&self) -> usize {
        self.lock().tabs.len()
    }

    /// Tabs opened through ctrl-click so far.
    pub fn opened_tab_count(&self) -> usize {
        self.lock().opened
    }

    /// Most tabs that were open at the same time.
    pub fn max_open_tabs(&self) -> usize {
        self.lock().max_open
    }

    pub fn active_url(&self) -> Option<String> {
        let state = self.lock();
        state.active_tab().ok().map(|tab| tab.url.clone())
    }

    pub fn typed_into(&self, id: &str) -> Option<String> {
        self.lock().typed.get(id).cloned()
    }

    pub fn cookie_count(&self) -> usize {
        self.lock().cookies.len()
    }

    pub fn has_quit(&self) -> bool {
        self.lock().quit
    }

    fn navigate_active(state: &mut State, url: &str) -> Result<(), BrowserError> {
        let handle = state
            .active
            .clone()
            .ok_or_else(|| BrowserError::driver("no active browsing context"))?;
        let tab = state
            .tabs
            .iter_mut()
            .find(|t| t.handle == handle)
            .ok_or_else(|| BrowserError::no_such_context(ContextHandle::new(&handle)))?;
        tab.url = url.to_string();
        tab.generation += 1;
        Ok(())
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        Self::navigate_active(&mut state, url)
    }

    async fn find_all(
        &self,
        scope: Option<&FakeElement>,
        locator: Locator,
    ) -> Result<Vec<FakeElement>, BrowserError> {
        let mut state = self.lock();
        let selectors = parse_locator(locator);

        let (tab, generation) = {
            let active = state.active_tab()?;
            (active.handle.clone(), active.generation)
        };

        if let Some(scope) = scope {
            let (node, _) = state.resolve(scope)?;
            let stale_class = node
                .classes
                .iter()
                .find(|c| state.stale_scopes.get(*c).is_some_and(|n| *n > 0))
                .cloned();
            if let Some(class) = stale_class {
                if let Some(n) = state.stale_scopes.get_mut(&class) {
                    *n -= 1;
                }
                return Err(BrowserError::StaleReference);
            }
        }

        let (start, mut ancestors, mut path) = match scope {
            Some(scope) => {
                let (node, ancestors) = state.resolve(scope)?;
                (node, ancestors, scope.path.clone())
            }
            None => {
                let root = state.page(&state.active_tab()?.url);
                (root, Vec::new(), Vec::new())
            }
        };
        let mut found = Vec::new();
        collect(start, &mut path, &mut ancestors, &selectors, &mut found);

        Ok(found
            .into_iter()
            .map(|path| FakeElement {
                tab: tab.clone(),
                generation,
                path,
            })
            .collect())
    }

    async fn text(&self, element: &FakeElement) -> Result<String, BrowserError> {
        let state = self.lock();
        let (node, _) = state.resolve(element)?;
        Ok(node.rendered_text())
    }

    async fn attribute(
        &self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let state = self.lock();
        let (node, _) = state.resolve(element)?;
        if name == "class" {
            return Ok((!node.classes.is_empty()).then(|| node.classes.join(" ")));
        }
        Ok(node.attrs.get(name).cloned())
    }

    async fn send_keys(&self, element: &FakeElement, text: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let id = {
            let (node, _) = state.resolve(element)?;
            node.attrs.get("id").cloned().unwrap_or_default()
        };
        state.typed.entry(id).or_default().push_str(text);
        Ok(())
    }

    async fn click(&self, element: &FakeElement) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let target = {
            let (node, _) = state.resolve(element)?;
            node.attrs.get("data-goto").cloned()
        };
        let Some(target) = target else {
            return Ok(());
        };
        if let Some((user, pass)) = &state.accepted_login {
            let typed_user = state.typed.get("username").map(String::as_str);
            let typed_pass = state.typed.get("password").map(String::as_str);
            if typed_user != Some(user.as_str()) || typed_pass != Some(pass.as_str()) {
                return Ok(());
            }
        }
        Self::navigate_active(&mut state, &target)
    }

    async fn open_in_new_context(&self, element: &FakeElement) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let href = {
            let (node, _) = state.resolve(element)?;
            node.attrs.get("href").cloned()
        };
        let Some(href) = href else {
            return Ok(());
        };
        if state.block_new_tabs {
            return Ok(());
        }
        let handle = format!("tab-{}", state.next_tab);
        state.next_tab += 1;
        state.opened += 1;
        state.tabs.push(Tab {
            handle,
            url: href,
            generation: 0,
        });
        state.max_open = state.max_open.max(state.tabs.len());
        Ok(())
    }

    async fn context_handles(&self) -> Result<Vec<ContextHandle>, BrowserError> {
        let state = self.lock();
        Ok(state
            .tabs
            .iter()
            .map(|t| ContextHandle::new(&t.handle))
            .collect())
    }

    async fn active_context(&self) -> Result<ContextHandle, BrowserError> {
        let state = self.lock();
        Ok(ContextHandle::new(&state.active_tab()?.handle))
    }

    async fn switch_to(&self, handle: &ContextHandle) -> Result<(), BrowserError> {
        let mut state = self.lock();
        if state.tab(handle.as_str()).is_none() {
            return Err(BrowserError::no_such_context(handle.clone()));
        }
        if state.failing_switches > 0 {
            state.failing_switches -= 1;
            return Err(BrowserError::driver("switch to window failed"));
        }
        state.active = Some(handle.as_str().to_string());
        Ok(())
    }

    async fn close_active(&self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let Some(handle) = state.active.take() else {
            return Err(BrowserError::driver("no active browsing context"));
        };
        state.tabs.retain(|t| t.handle != handle);
        Ok(())
    }

    async fn cookie(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.lock().cookies.get(name).cloned())
    }

    async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.lock().cookies.clear();
        Ok(())
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        self.lock().quit = true;
        Ok(())
    }
}
