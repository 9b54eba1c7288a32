use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{debug, warn};
use varisat::{CnfFormula, Lit, Solver, Var};
use wait_timeout::ChildExt;

use crate::buffer::CnfInstance;
use crate::dimacs::parse_verdict;
use crate::error::{Error, Result};

/// A total assignment of the variables `1..=var_count` of an instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    /// `values[i]` is the value of the variable with index `i`, i.e. DIMACS number `i + 1`.
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// A model over `var_count` variables in which exactly `lits` hold; variables not mentioned are false.
    pub fn from_lits(var_count: usize, lits: impl IntoIterator<Item = Lit>) -> Self {
        let mut values = vec![false; var_count];
        for lit in lits {
            if let Some(value) = values.get_mut(lit.var().index()) {
                *value = lit.is_positive();
            }
        }
        Self { values }
    }

    /// Number of variables assigned.
    pub fn var_count(&self) -> usize {
        self.values.len()
    }

    /// The value of `var`, if it is assigned.
    pub fn value(&self, var: Var) -> Option<bool> {
        self.values.get(var.index()).copied()
    }

    /// Variables set true, in ascending order.
    pub fn true_vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.values.iter().positions(|value| *value).map(Var::from_index)
    }

    /// Whether every clause of `instance` has a true literal.
    pub fn satisfies(&self, instance: &CnfInstance) -> bool {
        instance.clauses().all(|clause| clause.iter().any(|lit| self.value(lit.var()) == Some(lit.is_positive())))
    }
}

/// What an oracle concluded about an instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The instance has a model.
    Satisfiable(Model),
    /// The instance has no model.
    Unsatisfiable,
    /// The oracle stopped without deciding, e.g. because it ran out of time.
    Inconclusive,
}

impl Verdict {
    /// Whether a model was found.
    pub fn is_sat(&self) -> bool {
        matches!(self, Verdict::Satisfiable(_))
    }

    /// Whether the instance was shown unsatisfiable.
    pub fn is_unsat(&self) -> bool {
        matches!(self, Verdict::Unsatisfiable)
    }

    /// The model, if satisfiable.
    pub fn model(&self) -> Option<&Model> {
        match self {
            Verdict::Satisfiable(model) => Some(model),
            _ => None,
        }
    }
}

/// Something that decides satisfiability of a [`CnfInstance`].
///
/// Errors are reserved for failures to obtain an answer; an unsatisfiable instance is a [`Verdict`].
pub trait Oracle {
    /// Decide `instance`.
    fn solve(&self, instance: &CnfInstance) -> Result<Verdict>;
}

impl<O: Oracle + ?Sized> Oracle for &O {
    fn solve(&self, instance: &CnfInstance) -> Result<Verdict> {
        (**self).solve(instance)
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn solve(&self, instance: &CnfInstance) -> Result<Verdict> {
        (**self).solve(instance)
    }
}

/// Decides instances in-process with the [`varisat`] CDCL solver.
#[derive(Copy, Clone, Debug, Default)]
pub struct VarisatOracle;

impl Oracle for VarisatOracle {
    fn solve(&self, instance: &CnfInstance) -> Result<Verdict> {
        let mut solver = Solver::new();
        solver.add_formula(&CnfFormula::from(instance.clauses().map(<[Lit]>::to_vec).collect_vec()));

        match solver.solve() {
            Err(e) => Err(Error::OracleInvocation {
                solver: PathBuf::from("varisat"),
                reason: format!("{e:?}"),
            }),
            Ok(false) => Ok(Verdict::Unsatisfiable),
            Ok(true) => {
                let lits = solver.model().unwrap_or_default();
                Ok(Verdict::Satisfiable(Model::from_lits(instance.var_count(), lits)))
            }
        }
    }
}

/// How to run an external SAT solver.
#[derive(Clone, Debug)]
pub struct OracleConfig {
    /// The solver executable, looked up on `PATH` if not a path.
    pub solver: PathBuf,
    /// Arguments passed before the instance path.
    pub args: Vec<String>,
    /// Wall-clock limit per invocation; `None` waits for the solver to exit.
    pub timeout: Option<Duration>,
    /// Directory for the temporary instance files; the system temporary directory if `None`.
    pub work_dir: Option<PathBuf>,
    /// How many times a failed spawn is retried. A missing executable is never retried.
    pub spawn_retries: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            solver: PathBuf::from("cryptominisat5"),
            args: vec!["--verb=0".to_string()],
            timeout: None,
            work_dir: None,
            spawn_retries: 1,
        }
    }
}

impl OracleConfig {
    /// Use the executable at `solver`.
    pub fn with_solver(mut self, solver: impl Into<PathBuf>) -> Self {
        self.solver = solver.into();
        self
    }

    /// Replace the arguments passed before the instance path.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Give up on an invocation after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Write temporary instance files into `dir`.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Retry a failed spawn up to `retries` times.
    pub fn with_spawn_retries(mut self, retries: usize) -> Self {
        self.spawn_retries = retries;
        self
    }
}

/// Runs a SAT solver executable on each instance, one process per call.
///
/// The instance is written to a temporary file passed as the last argument and removed when the call returns.
/// The verdict is read from the solver's standard output; the exit status alone is not trusted.
#[derive(Clone, Debug, Default)]
pub struct ExternalOracle {
    config: OracleConfig,
}

impl From<OracleConfig> for ExternalOracle {
    fn from(config: OracleConfig) -> Self {
        Self { config }
    }
}

impl ExternalOracle {
    /// The configuration in use.
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn invocation_error(&self, reason: impl Into<String>) -> Error {
        Error::OracleInvocation {
            solver: self.config.solver.clone(),
            reason: reason.into(),
        }
    }

    fn spawn(&self, instance_path: &Path) -> Result<Child> {
        let solver = &self.config.solver;
        let spawned = retry_spawn(self.config.spawn_retries, || {
            Command::new(solver)
                .args(&self.config.args)
                .arg(instance_path)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
        });
        spawned.map_err(|e| self.invocation_error(e.to_string()))
    }

    /// Run the solver on the file at `instance_path`; `None` if it timed out.
    fn run(&self, instance_path: &Path) -> Result<Option<(ExitStatus, String, String)>> {
        let mut child = self.spawn(instance_path)?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.config.timeout {
            None => child.wait()?,
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    // the reader threads finish once the killed child's pipes close
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(None);
                }
            },
        };

        Ok(Some((status, self.collect(stdout)?, self.collect(stderr)?)))
    }

    fn collect(&self, reader: Option<JoinHandle<std::io::Result<String>>>) -> Result<String> {
        match reader {
            None => Ok(String::new()),
            Some(handle) => match handle.join() {
                Ok(text) => Ok(text?),
                Err(_) => Err(self.invocation_error("output reader panicked")),
            },
        }
    }
}

/// Call `spawn` until it succeeds, at most `retries` extra times. A missing executable fails at once.
fn retry_spawn<T>(retries: usize, mut spawn: impl FnMut() -> std::io::Result<T>) -> std::io::Result<T> {
    let mut attempt = 0;
    loop {
        match spawn() {
            Err(e) if e.kind() != ErrorKind::NotFound && attempt < retries => {
                attempt += 1;
                warn!(error = %e, attempt, "spawning SAT solver failed, retrying");
            }
            result => return result,
        }
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        pipe.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    })
}

/// SAT competition solvers exit with 10 for satisfiable and 20 for unsatisfiable.
fn exit_carries_verdict(status: ExitStatus) -> bool {
    status.success() || matches!(status.code(), Some(10) | Some(20))
}

impl Oracle for ExternalOracle {
    fn solve(&self, instance: &CnfInstance) -> Result<Verdict> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sat-reductions-").suffix(".cnf");
        let mut file = match &self.config.work_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            instance.write_dimacs(&mut writer)?;
            writer.flush()?;
        }

        let started = Instant::now();
        debug!(solver = %self.config.solver.display(), instance = %file.path().display(), "running SAT solver");
        // `file` stays alive, and on disk, until this function returns by any path
        let Some((status, stdout, stderr)) = self.run(file.path())? else {
            warn!(timeout = ?self.config.timeout, "SAT solver timed out");
            return Ok(Verdict::Inconclusive);
        };
        debug!(%status, elapsed = ?started.elapsed(), "SAT solver finished");

        match parse_verdict(&stdout, instance.var_count()) {
            Err(Error::MalformedOracleOutput(reason)) if !exit_carries_verdict(status) => {
                Err(self.invocation_error(format!("exited with {status} ({reason}): {}", stderr.trim())))
            }
            Ok(Verdict::Satisfiable(model)) if !model.satisfies(instance) => {
                Err(Error::malformed("the reported model violates a clause"))
            }
            verdict => verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use varisat::Var;

    use crate::buffer::CnfInstance;

    use std::io::{Error, ErrorKind};

    use super::{retry_spawn, Model, Oracle, VarisatOracle, Verdict};

    fn instance(var_count: usize, clauses: &[&[isize]]) -> CnfInstance {
        CnfInstance::from_clauses(
            var_count,
            clauses.iter().map(|clause| clause.iter().map(|n| varisat::Lit::from_dimacs(*n)).collect()).collect(),
        )
    }

    #[test]
    fn model_lookup() {
        let model = Model::new(vec![true, false, true]);

        assert_eq!(model.value(Var::from_index(1)), Some(false));
        assert_eq!(model.value(Var::from_index(3)), None);
        assert_eq!(model.true_vars().map(|v| v.to_dimacs()).collect::<Vec<_>>(), vec![1, 3]);
        assert!(model.satisfies(&instance(3, &[&[1, 2], &[-2]])));
        assert!(!model.satisfies(&instance(3, &[&[-1, -3]])));
    }

    #[test]
    fn varisat_decides() {
        let sat = instance(2, &[&[1, 2], &[-1]]);
        let verdict = VarisatOracle.solve(&sat).unwrap();
        assert!(verdict.model().unwrap().satisfies(&sat));
        assert_eq!(verdict.model().unwrap().var_count(), 2);

        assert_eq!(VarisatOracle.solve(&instance(1, &[&[1], &[-1]])).unwrap(), Verdict::Unsatisfiable);
    }

    #[test]
    fn spawn_is_retried() {
        let mut calls = 0;
        let spawned = retry_spawn(1, || {
            calls += 1;
            match calls {
                1 => Err(Error::from(ErrorKind::PermissionDenied)),
                _ => Ok(calls),
            }
        });
        assert_eq!(spawned.unwrap(), 2);

        let mut calls = 0;
        let spawned: std::io::Result<()> = retry_spawn(1, || {
            calls += 1;
            Err(Error::from(ErrorKind::PermissionDenied))
        });
        assert_eq!(spawned.unwrap_err().kind(), ErrorKind::PermissionDenied);
        assert_eq!(calls, 2);
    }

    #[test]
    fn missing_executable_is_not_retried() {
        let mut calls = 0;
        let spawned: std::io::Result<()> = retry_spawn(3, || {
            calls += 1;
            Err(Error::from(ErrorKind::NotFound))
        });
        assert_eq!(spawned.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(calls, 1);
    }
}
