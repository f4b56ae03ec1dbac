/// A GitHub Actions `if:` expression built from parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Expr(String),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn expr(raw: impl Into<String>) -> Self {
        Self::Expr(raw.into())
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn any_of<I, S>(exprs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Or(exprs.into_iter().map(|e| Self::Expr(e.into())).collect())
    }

    pub fn render(&self) -> String {
        match self {
            Self::Expr(raw) => raw.clone(),
            Self::And(parts) => join(parts, " && ", |part| matches!(part, Self::Or(p) if p.len() > 1)),
            Self::Or(parts) => join(parts, " || ", |part| matches!(part, Self::And(p) if p.len() > 1)),
        }
    }
}

fn join(parts: &[Condition], separator: &str, needs_parens: impl Fn(&Condition) -> bool) -> String {
    parts
        .iter()
        .map(|part| {
            let rendered = part.render();
            if needs_parens(part) {
                format!("({rendered})")
            } else {
                rendered
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn job_output(job: &str, key: &str) -> String {
    format!("needs.{job}.outputs.{key}")
}

/// Gate for a job that consumes items of `output_type` emitted by `main_job`.
/// A run without such items skips the job rather than failing it.
pub fn safe_output_gate(main_job: &str, output_type: &str) -> Condition {
    Condition::expr("!cancelled()")
        .and(Condition::expr(format!("needs.{main_job}.result != 'skipped'")))
        .and(Condition::expr(format!(
            "contains({}, '{output_type}')",
            job_output(main_job, "output_types")
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_or_is_parenthesized_inside_and() {
        let condition = safe_output_gate("agent", "close_issue").and(Condition::any_of([
            "github.event.issue.number",
            "github.event.pull_request.number",
        ]));
        assert_eq!(
            condition.render(),
            "!cancelled() && needs.agent.result != 'skipped' && contains(needs.agent.outputs.output_types, 'close_issue') && (github.event.issue.number || github.event.pull_request.number)"
        );
    }

    #[test]
    fn single_alternative_renders_bare() {
        let condition = Condition::expr("a").and(Condition::any_of(["b"]));
        assert_eq!(condition.render(), "a && b");
    }
}
