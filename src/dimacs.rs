//! The DIMACS CNF text format and the verdict text SAT solvers print.
//!
//! An instance is a header `p cnf <variables> <clauses>` followed by one line per clause:
//! space-separated non-zero literals terminated by `0`.

use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};

use varisat::{Lit, Var};

use crate::buffer::CnfInstance;
use crate::error::{Error, Result};
use crate::oracle::{Model, Verdict};

impl Display for CnfInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "p cnf {} {}", self.var_count(), self.clause_count())?;
        for clause in self.clauses() {
            for lit in clause {
                write!(f, "{} ", lit.to_dimacs())?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

impl CnfInstance {
    /// Write this instance in DIMACS form to `target`.
    pub fn write_dimacs(&self, mut target: impl Write) -> io::Result<()> {
        write!(target, "{self}")?;
        target.flush()
    }
}

/// Read a DIMACS instance.
///
/// Comment lines (`c ...`) are skipped and clauses may span lines.
/// The clause count of the header must match the clauses found.
pub fn parse_dimacs(reader: impl BufRead) -> Result<CnfInstance> {
    let mut header: Option<(usize, usize)> = None;
    let mut clauses = Vec::new();
    let mut clause: Vec<Lit> = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }

        if line.starts_with('p') {
            if header.is_some() {
                return Err(Error::invalid(format!("line {}: second problem line", number + 1)));
            }
            let (var_count, clause_count) = parse_header(line)
                .ok_or_else(|| Error::invalid(format!("line {}: bad problem line {line:?}", number + 1)))?;
            if var_count > Var::max_count() {
                return Err(Error::invalid(format!("line {}: {var_count} variables exceed the supported {}", number + 1, Var::max_count())));
            }
            header = Some((var_count, clause_count));
            continue;
        }

        let Some((var_count, _)) = header else {
            return Err(Error::invalid(format!("line {}: clause before the problem line", number + 1)));
        };

        for token in line.split_whitespace() {
            let value = token.parse::<isize>()
                .map_err(|e| Error::invalid(format!("line {}: {e}: {token:?}", number + 1)))?;
            if value == 0 {
                if clause.is_empty() {
                    return Err(Error::invalid(format!("line {}: empty clause", number + 1)));
                }
                clauses.push(std::mem::take(&mut clause));
            } else if value.unsigned_abs() > var_count {
                return Err(Error::invalid(format!("line {}: literal {value} exceeds {var_count} variables", number + 1)));
            } else {
                clause.push(Lit::from_dimacs(value));
            }
        }
    }

    let Some((var_count, clause_count)) = header else {
        return Err(Error::invalid("no problem line"));
    };
    if !clause.is_empty() {
        return Err(Error::invalid("last clause is not terminated by 0"));
    }
    if clauses.len() != clause_count {
        return Err(Error::invalid(format!("header declares {clause_count} clauses, found {}", clauses.len())));
    }

    Ok(CnfInstance::from_clauses(var_count, clauses))
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["p", "cnf", vars, clauses] => Some((vars.parse().ok()?, clauses.parse().ok()?)),
        _ => None,
    }
}

/// Interpret what a SAT solver printed for an instance over `var_count` variables.
///
/// Lines starting with `c` are solver comments and are ignored.
/// `UNSATISFIABLE` wins over anything else; `INDETERMINATE` or `UNKNOWN` mean no answer was reached.
/// Otherwise the integers of the output are the model, which must assign every variable exactly once.
pub fn parse_verdict(text: &str, var_count: usize) -> Result<Verdict> {
    let mut claims_sat = false;
    let mut numbers = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.starts_with('c')) {
        for token in line.split_whitespace() {
            match token {
                "UNSATISFIABLE" => return Ok(Verdict::Unsatisfiable),
                "INDETERMINATE" | "UNKNOWN" => return Ok(Verdict::Inconclusive),
                "SATISFIABLE" => claims_sat = true,
                _ => numbers.extend(token.parse::<isize>().ok()),
            }
        }
    }

    if !claims_sat && numbers.is_empty() {
        return Err(Error::malformed("no verdict found"));
    }

    let mut values: Vec<Option<bool>> = vec![None; var_count];
    for value in numbers.into_iter().filter(|value| *value != 0) {
        let index = value.unsigned_abs() - 1;
        match values.get_mut(index) {
            None => return Err(Error::malformed(format!("literal {value} exceeds {var_count} variables"))),
            Some(Some(_)) => return Err(Error::malformed(format!("variable {} assigned twice", index + 1))),
            Some(slot) => *slot = Some(value > 0),
        }
    }

    match values.iter().position(Option::is_none) {
        Some(index) => Err(Error::malformed(format!("incomplete model: variable {} unassigned", index + 1))),
        None => Ok(Verdict::Satisfiable(Model::new(values.into_iter().flatten().collect()))),
    }
}
