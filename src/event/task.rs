use crate::runtime::HostContext;
use std::{borrow::Cow, fmt::Debug, sync::Arc};

type Callback = dyn Fn(&mut HostContext<'_>) + Send + Sync;

///
/// A shared, reference counted unit of work.
///
/// A task is bound to a host only once it is wrapped into an
/// [`Event`](crate::event::Event). The same task may be carried by
/// many events at once, each of them holding one reference.
/// Cloning a task takes another reference, dropping it releases one.
/// Releasing the last reference never invokes the callback, it only
/// drops the captured data.
///
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

struct TaskInner {
    name: Cow<'static, str>,
    kind: TaskKind,
}

enum TaskKind {
    Callback(Box<Callback>),
    Stop,
}

impl Task {
    ///
    /// Creates a new task from a callback. The callback is invoked
    /// once per executed event carrying this task.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pdes::prelude::*;
    /// let task = Task::new(|ctx| {
    ///     let _ = ctx.now();
    /// });
    /// assert_eq!(task.ref_count(), 1);
    /// ```
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut HostContext<'_>) + Send + Sync + 'static,
    {
        Self::named("task", f)
    }

    /// Creates a new task with a name, used in log output.
    pub fn named<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&mut HostContext<'_>) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(TaskInner {
                name: name.into(),
                kind: TaskKind::Callback(Box::new(f)),
            }),
        }
    }

    ///
    /// Creates a task from a plain function, its data and a callback
    /// argument. Both `data` and `arg` are owned by the task and dropped
    /// together with its last reference.
    ///
    pub fn with_data<D, A>(execute: fn(&mut HostContext<'_>, &D, &A), data: D, arg: A) -> Self
    where
        D: Send + Sync + 'static,
        A: Send + Sync + 'static,
    {
        Self::new(move |ctx| execute(ctx, &data, &arg))
    }

    ///
    /// The dedicated shutdown task. Executing it marks the engine as
    /// killed. The window it ran in completes, then the run ends.
    ///
    pub fn stop() -> Self {
        Self {
            inner: Arc::new(TaskInner {
                name: Cow::Borrowed("stop"),
                kind: TaskKind::Stop,
            }),
        }
    }

    /// The name of the task.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether this is the shutdown task.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self.inner.kind, TaskKind::Stop)
    }

    /// The number of live references to this task.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub(crate) fn execute(&self, ctx: &mut HostContext<'_>) {
        match &self.inner.kind {
            TaskKind::Callback(f) => f(ctx),
            TaskKind::Stop => ctx.stop(),
        }
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.inner.name)
            .field("refs", &self.ref_count())
            .finish()
    }
}
