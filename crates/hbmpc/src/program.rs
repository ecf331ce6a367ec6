//! MPC programs and the task-based runner executing them on all parties.

use crate::context::Context;
use crate::net::{Mailbox, Router};
use crate::parameters::MpcParameters;
use crate::preprocessing::SharedStore;
use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use hbmpc_math::field::FieldElement;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// An MPC program, run by every party on its own [`Context`].
///
/// Programs are plain functions returning a boxed future, e.g.
///
/// ```
/// # use hbmpc::{Context, Result};
/// # use hbmpc_math::field::FieldElement;
/// # use futures::future::{BoxFuture, FutureExt};
/// fn open_one(ctx: &mut Context) -> BoxFuture<'_, Result<Vec<FieldElement>>> {
///     async move {
///         let one = ctx.share(ctx.field().one());
///         Ok(vec![ctx.open(&one).await?])
///     }
///     .boxed()
/// }
/// ```
pub type Program = for<'a> fn(&'a mut Context) -> BoxFuture<'a, Result<Vec<FieldElement>>>;

/// Programs available by name.
#[derive(Clone, Default)]
pub struct ProgramRegistry {
    programs: BTreeMap<String, Program>,
}

impl fmt::Debug for ProgramRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramRegistry")
            .field("programs", &self.names())
            .finish()
    }
}

impl ProgramRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `program` under `name`.
    pub fn register(&mut self, name: &str, program: Program) -> Result<&mut Self> {
        if self.programs.contains_key(name) {
            return Err(Error::DefaultError(format!(
                "program {} is already registered",
                name
            )));
        }
        self.programs.insert(name.to_string(), program);
        Ok(self)
    }

    /// The program registered under `name`.
    pub fn get(&self, name: &str) -> Result<Program> {
        self.programs
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownProgram(name.to_string()))
    }

    /// Names of the registered programs, in order.
    pub fn names(&self) -> Vec<&str> {
        self.programs.keys().map(|k| k.as_str()).collect()
    }
}

/// Runs a program on all n parties of a session as tokio tasks connected by
/// an in-process [`Router`].
#[derive(Debug, Clone)]
pub struct TaskProgramRunner {
    par: Arc<MpcParameters>,
    store: SharedStore,
    delays: Option<(u64, Duration)>,
}

impl TaskProgramRunner {
    /// Create a runner whose parties draw preprocessing from `store`.
    pub fn new(par: &Arc<MpcParameters>, store: SharedStore) -> Self {
        Self {
            par: par.clone(),
            store,
            delays: None,
        }
    }

    /// Delay every message by a random duration up to `max_delay`, drawn
    /// from an RNG seeded with `seed`.
    pub fn with_delays(mut self, seed: u64, max_delay: Duration) -> Self {
        self.delays = Some((seed, max_delay));
        self
    }

    /// Run `program` on every party, returning the outputs in party order.
    ///
    /// The first party to fail or panic aborts the run with
    /// `Error::ProgramFailed`.
    pub async fn run(&self, program: Program) -> Result<Vec<Vec<FieldElement>>> {
        let n = self.par.n();
        let (router, inboxes) = match self.delays {
            Some((seed, max_delay)) => Router::with_delays(n, seed, max_delay),
            None => Router::new(n),
        };
        info!(n, t = self.par.t(), "running program");

        let mut tasks = JoinSet::new();
        for (i, inbox) in inboxes.into_iter().enumerate() {
            let mailbox = Mailbox::spawn(i, self.par.field(), router.clone(), inbox);
            let mut ctx = Context::new(i, &self.par, mailbox, self.store.clone());
            tasks.spawn(async move {
                let output = AssertUnwindSafe(program(&mut ctx)).catch_unwind().await;
                (i, output)
            });
        }

        let mut outputs = vec![vec![]; n];
        while let Some(joined) = tasks.join_next().await {
            let (i, output) = joined.map_err(|e| Error::ProgramFailed(n, e.to_string()))?;
            match output {
                Ok(Ok(values)) => {
                    debug!(party = i, outputs = values.len(), "party finished");
                    outputs[i] = values;
                }
                Ok(Err(e)) => {
                    warn!(party = i, error = %e, "party failed");
                    return Err(Error::ProgramFailed(i, e.to_string()));
                }
                Err(_) => {
                    warn!(party = i, "party panicked");
                    return Err(Error::ProgramFailed(i, "panicked".to_string()));
                }
            }
        }
        info!(n, "program finished");
        Ok(outputs)
    }

    /// Run the program registered under `name`.
    pub async fn run_named(
        &self,
        registry: &ProgramRegistry,
        name: &str,
    ) -> Result<Vec<Vec<FieldElement>>> {
        self.run(registry.get(name)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::{ProgramRegistry, TaskProgramRunner};
    use crate::context::Context;
    use crate::parameters::MpcParameters;
    use crate::preprocessing::PreprocessingStore;
    use crate::{Error, Result};
    use futures::future::{BoxFuture, FutureExt};
    use hbmpc_math::field::FieldElement;

    fn my_id(ctx: &mut Context) -> BoxFuture<'_, Result<Vec<FieldElement>>> {
        async move { Ok(vec![ctx.field().element(ctx.my_id() as u64)]) }.boxed()
    }

    fn empty(_: &mut Context) -> BoxFuture<'_, Result<Vec<FieldElement>>> {
        async move { Ok(vec![]) }.boxed()
    }

    fn panics(ctx: &mut Context) -> BoxFuture<'_, Result<Vec<FieldElement>>> {
        async move {
            if ctx.my_id() == 2 {
                panic!("party 2 gives up");
            }
            Ok(vec![])
        }
        .boxed()
    }

    #[test]
    fn registry() {
        let mut registry = ProgramRegistry::new();
        registry.register("my_id", my_id).unwrap();
        registry.register("empty", empty).unwrap();
        assert_eq!(registry.names(), vec!["empty", "my_id"]);
        assert!(registry.register("empty", my_id).is_err());
        assert!(registry.get("my_id").is_ok());
        assert_eq!(
            registry.get("missing").err(),
            Some(Error::UnknownProgram("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn outputs_in_party_order() {
        let par = MpcParameters::default_arc(4, 1);
        let runner = TaskProgramRunner::new(&par, PreprocessingStore::new().into_shared());
        let outputs = runner.run(my_id).await.unwrap();
        let f = par.field();
        assert_eq!(
            outputs,
            (0..4).map(|i| vec![f.element(i)]).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn panics_are_errors() {
        let par = MpcParameters::default_arc(4, 1);
        let runner = TaskProgramRunner::new(&par, PreprocessingStore::new().into_shared());
        assert!(matches!(
            runner.run(panics).await,
            Err(Error::ProgramFailed(2, _))
        ));
    }
}
