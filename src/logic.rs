use std::ops::Index;

use itertools::Itertools;
use varisat::{Lit, Var};

/// No two of `vars` are true; (!A + !B) * (!A + !C) * ...
pub(crate) fn at_most_one(vars: &[Var]) -> Vec<Vec<Lit>> {
    vars.iter()
        .combinations(2)
        .map(|pair| vec![pair.index(0).negative(), pair.index(1).negative()])
        .collect_vec()
}

/// Exactly one of `vars` is true.
pub(crate) fn exactly_one(vars: &[Var]) -> Vec<Vec<Lit>> {
    let mut clauses = Vec::with_capacity(vars.len() * vars.len().saturating_sub(1) / 2 + 1);

    // at least one var is true; A + B + C + ...
    clauses.push(vars.iter().map(|v| v.positive()).collect_vec());
    clauses.extend(at_most_one(vars));

    clauses
}

/// C(n, 2), the number of clauses [`at_most_one`] produces for `n` variables.
pub(crate) fn pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use varisat::Var;

    use super::{at_most_one, exactly_one, pairs};

    #[test]
    fn exactly_one_leads_with_the_wide_clause() {
        let vars = (0..4).map(Var::from_index).collect::<Vec<_>>();
        let clauses = exactly_one(&vars);

        assert_eq!(clauses.len(), 1 + pairs(4));
        assert_eq!(clauses[0].iter().map(|l| l.to_dimacs()).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(clauses[1..].iter().all(|c| c.len() == 2 && c.iter().all(|l| l.is_negative())));
    }

    #[test]
    fn single_variable_has_no_pairs() {
        assert!(at_most_one(&[Var::from_index(0)]).is_empty());
        assert_eq!(exactly_one(&[Var::from_index(0)]).len(), 1);
        assert_eq!(pairs(0), 0);
        assert_eq!(pairs(1), 0);
    }
}
