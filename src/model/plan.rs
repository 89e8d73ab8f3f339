//! The declared side of a reconciliation pass: queries, space plans, and the
//! hydrated form the convergence engine consumes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::gateway::Gateway;
use crate::model::{LayoutKind, Space, Window};

/// Title constraint of an [`AppQuery`]: a closed variant, evaluated
/// uniformly. Absence of a constraint matches any title.
#[derive(Clone)]
pub enum TitleMatch {
    Exact(String),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl TitleMatch {
    /// Compile a regex pattern into a predicate matcher.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let re = regex::Regex::new(pattern)?;
        Ok(Self::Predicate(Arc::new(move |title| re.is_match(title))))
    }

    pub fn matches(&self, title: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == title,
            Self::Predicate(predicate) => predicate(title),
        }
    }
}

impl fmt::Debug for TitleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(expected) => f.debug_tuple("Exact").field(expected).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Locates a window among a pool of candidates. Application name equality is
/// mandatory; the optional title constraint narrows further. The optional
/// open action launches the application when the window opener is asked to
/// produce a window that is not there yet.
#[derive(Clone)]
pub struct AppQuery {
    pub app: String,
    pub title: Option<TitleMatch>,
    pub open: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl AppQuery {
    pub fn app(name: impl Into<String>) -> Self {
        Self {
            app: name.into(),
            title: None,
            open: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(TitleMatch::Exact(title.into()));
        self
    }

    pub fn with_title_match(mut self, title: TitleMatch) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_open(mut self, open: impl Fn() + Send + Sync + 'static) -> Self {
        self.open = Some(Arc::new(open));
        self
    }

    pub fn matches(&self, window: &Window) -> bool {
        if self.app != window.app {
            return false;
        }
        match &self.title {
            None => true,
            Some(title) => title.matches(&window.title),
        }
    }

    /// Invoke the open action, if any. Returns whether one was present.
    pub fn launch(&self) -> bool {
        match &self.open {
            Some(open) => {
                open();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for AppQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppQuery")
            .field("app", &self.app)
            .field("title", &self.title)
            .field("open", &self.open.as_ref().map(|_| ".."))
            .finish()
    }
}

/// One declared space: where it is, how it lays out, and which windows live
/// on it in which left-to-right order. `sizes`, when present, carries one
/// width ratio per query slot and must sum to 1.
#[derive(Debug, Clone)]
pub struct SpacePlan {
    /// 1-based declared index; negative counts from the end of the live
    /// space list.
    pub index: i32,
    pub layout: LayoutKind,
    pub windows: Vec<AppQuery>,
    pub sizes: Option<Vec<f64>>,
}

impl SpacePlan {
    pub fn new(index: i32, layout: LayoutKind, windows: Vec<AppQuery>) -> Self {
        Self {
            index,
            layout,
            windows,
            sizes: None,
        }
    }

    pub fn with_sizes(mut self, sizes: Vec<f64>) -> Self {
        self.sizes = Some(sizes);
        self
    }
}

/// Read-only surroundings handed to the fallback handler.
pub struct Context<'a> {
    pub spaces: &'a [Space],
}

/// Handler for windows no space plan claimed. Runs after hydration and
/// before any space is converged.
pub type FallbackHandler = Box<
    dyn for<'a> FnMut(
        Vec<Window>,
        Context<'a>,
        &'a dyn Gateway,
    ) -> Pin<Box<dyn Future<Output = ()> + 'a>>,
>;

/// The full declaration: spaces in application order, plus the optional
/// fallback for unclaimed windows.
pub struct LayoutPlan {
    pub spaces: Vec<SpacePlan>,
    pub fallback: Option<FallbackHandler>,
}

impl LayoutPlan {
    pub fn new(spaces: Vec<SpacePlan>) -> Self {
        Self {
            spaces,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackHandler) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

/// A [`SpacePlan`] with each query resolved to a window or absent, plus the
/// live space record it targets. Built once per pass; any field that a
/// mutating command can invalidate must be refreshed before it is read
/// again.
#[derive(Debug)]
pub struct HydratedSpacePlan {
    pub index: i32,
    pub layout: LayoutKind,
    pub slots: Vec<Option<Window>>,
    pub sizes: Option<Vec<f64>>,
    pub space: Option<Space>,
}

impl HydratedSpacePlan {
    /// The bound windows in slot order, absent slots filtered out.
    pub fn bound_windows(&self) -> Vec<Window> {
        self.slots.iter().flatten().cloned().collect()
    }

    pub fn is_fully_bound(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}
