//! Interpreter session: the function registry and its configuration.
//!
//! Sources are loaded in phases (the prelude, then one or more program texts).
//! Each load is atomic: the text is parsed against a copy of the arity table
//! and its definitions are committed only if the whole text parses. Later
//! definitions of a name replace earlier ones.

use std::collections::HashSet;

use log::{debug, warn};

use crate::arity::ArityTable;
use crate::ast::Program;
use crate::console::Console;
use crate::evaluator::Evaluator;
use crate::parser::{ParsedSource, parse_expression, parse_source};
use crate::prelude::PRELUDE;
use crate::value::Value;
use crate::{ENTRY_POINT, Error};

/// Interpreter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Load the prelude before any user source
    pub load_prelude: bool,
    /// Maximum number of active non-tail calls; `None` for no limit
    pub max_call_depth: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            load_prelude: true,
            max_call_depth: None,
        }
    }
}

#[derive(Debug)]
pub struct Interpreter {
    config: Config,
    arities: ArityTable,
    program: Program,
    prelude_names: HashSet<String>,
}

impl Interpreter {
    /// Create an interpreter with the default configuration (prelude loaded)
    pub fn new() -> Result<Self, Error> {
        Interpreter::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, Error> {
        let mut interpreter = Interpreter {
            config,
            arities: ArityTable::new(),
            program: Program::new(),
            prelude_names: HashSet::new(),
        };
        if interpreter.config.load_prelude {
            let parsed = parse_source(PRELUDE, &interpreter.arities)?;
            interpreter.prelude_names = parsed
                .definitions
                .iter()
                .map(|def| def.name.clone())
                .collect();
            interpreter.commit(parsed);
            debug!("loaded prelude: {} definitions", interpreter.prelude_names.len());
        }
        Ok(interpreter)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse `source` and register its definitions.
    ///
    /// On error nothing from `source` is registered.
    pub fn load(&mut self, source: &str) -> Result<(), Error> {
        let parsed = parse_source(source, &self.arities)?;
        for def in &parsed.definitions {
            if self.prelude_names.contains(&def.name) {
                warn!("'{}' overrides the prelude definition", def.name);
            }
        }
        self.commit(parsed);
        Ok(())
    }

    fn commit(&mut self, parsed: ParsedSource) {
        for def in parsed.definitions {
            debug!("defined {} ({} parameters) at {}", def.name, def.arity(), def.position);
            self.program.define(def);
        }
        self.arities = parsed.arities;
    }

    /// Run the entry point with the given arguments
    pub fn run_main(&self, args: Vec<Value>, console: &mut dyn Console) -> Result<Value, Error> {
        self.call(ENTRY_POINT, args, console)
    }

    /// Call a defined function by name
    pub fn call(
        &self,
        name: &str,
        args: Vec<Value>,
        console: &mut dyn Console,
    ) -> Result<Value, Error> {
        let def = self
            .program
            .get(name)
            .ok_or_else(|| Error::MissingEntry(name.to_owned()))?;
        if def.arity() != args.len() {
            return Err(Error::EntryArity {
                name: name.to_owned(),
                expected: def.arity(),
                got: args.len(),
            });
        }

        debug!("running {name} with {} arguments", args.len());
        let result = self.evaluator().call(def, args, console)?;
        debug!("{name} finished");
        Ok(result)
    }

    /// Evaluate one stand-alone expression against the loaded definitions
    pub fn eval_expression(
        &self,
        source: &str,
        console: &mut dyn Console,
    ) -> Result<Value, Error> {
        let expr = parse_expression(source, &self.arities)?;
        Ok(self.evaluator().eval(&expr, console)?)
    }

    /// Names of all defined functions, sorted
    pub fn function_names(&self) -> Vec<&str> {
        self.program.names()
    }

    /// Arity of a builtin or defined function
    pub fn arity_of(&self, name: &str) -> Option<usize> {
        self.arities.lookup(name)
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.program).with_max_call_depth(self.config.max_call_depth)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::value::val;
    use crate::{EvalErrorKind, ParseErrorKind};
    use pretty_assertions::assert_eq;

    fn bare() -> Interpreter {
        Interpreter::with_config(Config {
            load_prelude: false,
            max_call_depth: None,
        })
        .unwrap()
    }

    #[test]
    fn test_run_main() {
        let mut interpreter = Interpreter::new().unwrap();
        interpreter
            .load("fn add x y is + x y\nfn main is print add 5 3")
            .unwrap();

        let mut console = ScriptedConsole::default();
        let result = interpreter.run_main(vec![], &mut console).unwrap();
        assert_eq!(result, val(8));
        assert_eq!(console.output(), ["8"]);
    }

    #[test]
    fn test_entry_errors() {
        let mut interpreter = bare();
        let mut console = ScriptedConsole::default();

        assert_eq!(
            interpreter.run_main(vec![], &mut console),
            Err(Error::MissingEntry("main".to_owned()))
        );

        interpreter.load("fn main a b is + a b").unwrap();
        assert_eq!(
            interpreter.run_main(vec![val(1)], &mut console),
            Err(Error::EntryArity {
                name: "main".to_owned(),
                expected: 2,
                got: 1,
            })
        );
        assert_eq!(
            interpreter.run_main(vec![val(1), val(2)], &mut console),
            Ok(val(3))
        );
    }

    #[test]
    fn test_last_definition_wins_everywhere() {
        let mut interpreter = bare();
        interpreter
            .load("fn f is 1\nfn main is f\nfn f is 2")
            .unwrap();
        let result = interpreter
            .run_main(vec![], &mut ScriptedConsole::default())
            .unwrap();
        assert_eq!(result, val(2));
    }

    #[test]
    fn test_load_is_atomic() {
        let mut interpreter = bare();
        interpreter.load("fn keep is 1").unwrap();

        let err = interpreter
            .load("fn added is 2\nfn keep is 3\nfn broken is missing")
            .unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnknownFunction));

        assert_eq!(interpreter.arity_of("added"), None);
        assert_eq!(interpreter.function_names(), ["keep"]);
        let mut console = ScriptedConsole::default();
        assert_eq!(interpreter.eval_expression("keep", &mut console), Ok(val(1)));
    }

    #[test]
    fn test_overriding_the_prelude() {
        let mut interpreter = Interpreter::new().unwrap();
        assert_eq!(interpreter.arity_of("len"), Some(1));

        // `nth` calls `skip`, so replacing `skip` changes `nth` too
        interpreter.load("fn skip n l is l").unwrap();
        let mut console = ScriptedConsole::default();
        assert_eq!(
            interpreter.eval_expression("nth 2 pair 7 8", &mut console),
            Ok(val(7))
        );

        let err = interpreter.load("fn len a b is a").unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::ArityConflict));
    }

    #[test]
    fn test_without_prelude() {
        let interpreter = bare();
        assert!(!interpreter.config().load_prelude);
        assert!(interpreter.function_names().is_empty());
        let err = interpreter
            .eval_expression("len null", &mut ScriptedConsole::default())
            .unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnknownFunction));
    }

    #[test]
    fn test_max_call_depth() {
        let mut interpreter = Interpreter::with_config(Config {
            load_prelude: true,
            max_call_depth: Some(100),
        })
        .unwrap();
        interpreter.load("fn main n is len n").unwrap();

        let short = interpreter.eval_expression("len fuse 1 fuse 2 3", &mut ScriptedConsole::default());
        assert_eq!(short, Ok(val(3)));

        let list = Value::list((0..500).map(Value::Number).collect::<Vec<_>>());
        let err = interpreter
            .run_main(vec![list], &mut ScriptedConsole::default())
            .unwrap_err();
        assert_eq!(err.eval_kind(), Some(EvalErrorKind::RecursionLimit));
    }

    #[test]
    fn test_input_and_print() {
        let mut interpreter = Interpreter::new().unwrap();
        interpreter
            .load(
                "fn main is
                    print + \"Hello, \" input \"name? \"",
            )
            .unwrap();

        let mut console = ScriptedConsole::new(["Atto"]);
        let result = interpreter.run_main(vec![], &mut console).unwrap();
        assert_eq!(result, val("Hello, Atto"));
        assert_eq!(console.prompts(), ["name? "]);
        assert_eq!(console.output(), ["Hello, Atto"]);

        let err = interpreter
            .run_main(vec![], &mut ScriptedConsole::default())
            .unwrap_err();
        assert_eq!(err.eval_kind(), Some(EvalErrorKind::Io));
    }
}
