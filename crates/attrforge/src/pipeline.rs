//! # Hydration / Extraction Pipeline
//!
//! An onion of middleware stages built once per data type from the property
//! types that provide one, in property type dependency order:
//!
//! ```text
//! hydrate:  map ─▶ default ─▶ resolver ─▶ transform ─▶ (end)
//! extract:  map ◀─ default ◀─ resolver ◀─ transform ◀─ (end)
//! ```
//!
//! Every stage receives the call's [`AttributesContext`] and a [`Next`]
//! continuation. A stage works before calling `next` (hydration renames keys
//! before transformers see them), after it (extraction renames keys once
//! transformers have smashed the values), or both. A stage error aborts the
//! whole call.

use crate::context::AttributesContext;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Which way data is flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Raw → domain.
    Hydrate,
    /// Domain → raw.
    Extract,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Hydrate => f.write_str("Hydration"),
            Direction::Extract => f.write_str("Extraction"),
        }
    }
}

/// A hydrate/extract hook. Both directions default to passing straight
/// through.
pub trait Middleware: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn hydrate(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        next.run(cx)
    }

    fn extract(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        next.run(cx)
    }
}

/// The rest of the chain after the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    direction: Direction,
}

impl<'a> Next<'a> {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Run the remaining stages.
    pub fn run(self, cx: &mut AttributesContext<'_>) -> Result<()> {
        let Some((stage, rest)) = self.stages.split_first() else {
            return Ok(());
        };
        let next = Next {
            stages: rest,
            direction: self.direction,
        };
        trace!(stage = stage.name(), direction = %self.direction, "entering stage");
        match self.direction {
            Direction::Hydrate => stage.hydrate(cx, next),
            Direction::Extract => stage.extract(cx, next),
        }
    }
}

/// The compiled chain of one data type.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Middleware>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self, direction: Direction, cx: &mut AttributesContext<'_>) -> Result<()> {
        Next {
            stages: &self.stages,
            direction,
        }
        .run(cx)
    }

    pub fn hydrate(&self, cx: &mut AttributesContext<'_>) -> Result<()> {
        self.run(Direction::Hydrate, cx)
    }

    pub fn extract(&self, cx: &mut AttributesContext<'_>) -> Result<()> {
        self.run(Direction::Extract, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Slot;
    use crate::descriptor::DataTypeDescriptor;
    use crate::error::Error;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Appends `name:before` / `name:after` to a shared log.
    #[derive(Debug)]
    struct Tracer {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Tracer {
        fn record(&self, when: &str) {
            self.log.lock().unwrap().push(format!("{}:{when}", self.name));
        }
    }

    impl Middleware for Tracer {
        fn name(&self) -> &str {
            self.name
        }

        fn hydrate(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
            self.record("before");
            next.run(cx)?;
            self.record("after");
            Ok(())
        }

        fn extract(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
            self.record("before");
            next.run(cx)?;
            self.record("after");
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Fail;

    impl Middleware for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        fn hydrate(&self, _: &mut AttributesContext<'_>, _: Next<'_>) -> Result<()> {
            Err(Error::config("stage failed"))
        }
    }

    #[derive(Debug)]
    struct Stamp;

    impl Middleware for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn hydrate(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
            cx.insert_raw("stamped", Value::Bool(true));
            next.run(cx)
        }
    }

    fn tracers(log: &Arc<Mutex<Vec<String>>>) -> Pipeline {
        Pipeline::new(vec![
            Arc::new(Tracer {
                name: "a",
                log: log.clone(),
            }),
            Arc::new(Tracer {
                name: "b",
                log: log.clone(),
            }),
        ])
    }

    #[test]
    fn stages_nest_like_an_onion() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = tracers(&log);
        let descriptor = DataTypeDescriptor::empty("T");
        let mut cx = AttributesContext::new(&descriptor);

        pipeline.hydrate(&mut cx).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:before", "b:before", "b:after", "a:after"]
        );
        assert_eq!(pipeline.stage_names(), vec!["a", "b"]);
    }

    #[test]
    fn errors_abort_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stages = tracers(&log).stages;
        stages.insert(1, Arc::new(Fail));
        let pipeline = Pipeline::new(stages);
        let descriptor = DataTypeDescriptor::empty("T");
        let mut cx = AttributesContext::new(&descriptor);

        assert!(pipeline.hydrate(&mut cx).is_err());
        assert_eq!(*log.lock().unwrap(), vec!["a:before"]);
    }

    #[test]
    fn default_hooks_pass_through() {
        let pipeline = Pipeline::new(vec![Arc::new(Stamp)]);
        let descriptor = DataTypeDescriptor::empty("T");
        let mut cx = AttributesContext::new(&descriptor);

        pipeline.extract(&mut cx).unwrap();
        assert!(cx.get("stamped").is_none());

        pipeline.hydrate(&mut cx).unwrap();
        assert_eq!(cx.get("stamped"), Some(&Slot::Raw(json!(true))));
    }

    #[test]
    fn direction_names() {
        assert_eq!(Direction::Hydrate.to_string(), "Hydration");
        assert_eq!(Direction::Extract.to_string(), "Extraction");
    }
}
