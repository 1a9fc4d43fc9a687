use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use tracing::trace;

use crate::datetime::parse_date_expr;
use crate::record::{
  Record,
  RecordKind
};

#[derive(Debug, Clone)]
pub enum Pred {
  Id(String),
  TagInclude(String),
  TagExclude(String),
  KindEq(RecordKind),
  GroupEq(String),
  StartsBefore(NaiveDate),
  StartsAfter(NaiveDate),
  EndsBefore(NaiveDate),
  EndsAfter(NaiveDate),
  ActiveOn(NaiveDate),
  TextContains(String)
}

#[derive(Debug, Clone)]
enum Expr {
  True,
  Pred(Pred),
  And(Vec<Expr>),
  Or(Vec<Expr>)
}

#[derive(Debug, Clone)]
pub struct Filter {
  expr: Expr
}

impl Default for Filter {
  fn default() -> Self {
    Self {
      expr: Expr::True
    }
  }
}

impl Filter {
  #[tracing::instrument(skip(
    terms, today
  ))]
  pub fn parse(
    terms: &[String],
    today: NaiveDate
  ) -> anyhow::Result<Self> {
    if terms.is_empty() {
      return Ok(Self::default());
    }

    let tokens = lex_terms(terms);
    let mut parser = Parser {
      tokens: &tokens,
      pos: 0,
      today
    };
    let expr = parser.parse_or()?;
    parser.finish()?;

    trace!(?expr, "parsed record filter");
    Ok(Self {
      expr
    })
  }

  pub fn is_empty(&self) -> bool {
    matches!(self.expr, Expr::True)
  }

  pub fn matches(
    &self,
    record: &Record
  ) -> bool {
    eval_expr(&self.expr, record)
  }

  pub fn apply(
    &self,
    records: Vec<Record>
  ) -> Vec<Record> {
    if self.is_empty() {
      return records;
    }
    records
      .into_iter()
      .filter(|record| {
        self.matches(record)
      })
      .collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
  And,
  Or,
  Open,
  Close
}

fn keyword(
  token: &str
) -> Option<Keyword> {
  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "and" => Some(Keyword::And),
    | "or" => Some(Keyword::Or),
    | "(" => Some(Keyword::Open),
    | ")" => Some(Keyword::Close),
    | _ => None
  }
}

/// Recursive descent over lexed terms:
/// `or := and ("or" and)*`,
/// `and := primary (["and"] primary)*`.
struct Parser<'a> {
  tokens: &'a [String],
  pos:    usize,
  today:  NaiveDate
}

impl Parser<'_> {
  fn peek_keyword(
    &self
  ) -> Option<Keyword> {
    self
      .tokens
      .get(self.pos)
      .and_then(|token| keyword(token))
  }

  fn eat(
    &mut self,
    expected: Keyword
  ) -> bool {
    let found =
      self.peek_keyword() == Some(expected);
    if found {
      self.pos += 1;
    }
    found
  }

  fn parse_or(
    &mut self
  ) -> anyhow::Result<Expr> {
    let mut nodes =
      vec![self.parse_and()?];
    while self.eat(Keyword::Or) {
      nodes.push(self.parse_and()?);
    }
    Ok(collapse(nodes, Expr::Or))
  }

  fn parse_and(
    &mut self
  ) -> anyhow::Result<Expr> {
    let mut nodes =
      vec![self.parse_primary()?];
    loop {
      if self.eat(Keyword::And) {
        nodes
          .push(self.parse_primary()?);
        continue;
      }
      if self.pos >= self.tokens.len()
        || matches!(
          self.peek_keyword(),
          Some(Keyword::Or | Keyword::Close)
        )
      {
        break;
      }
      nodes.push(self.parse_primary()?);
    }
    Ok(collapse(nodes, Expr::And))
  }

  fn parse_primary(
    &mut self
  ) -> anyhow::Result<Expr> {
    let tokens = self.tokens;
    let Some(token) =
      tokens.get(self.pos)
    else {
      return Err(anyhow!(
        "filter expression ends early"
      ));
    };
    self.pos += 1;

    match keyword(token) {
      | Some(Keyword::Open) => {
        let inner = self.parse_or()?;
        if !self.eat(Keyword::Close) {
          return Err(anyhow!(
            "missing ')' in filter \
             expression"
          ));
        }
        Ok(inner)
      }
      | Some(_) => Err(anyhow!(
        "unexpected '{token}' in filter \
         expression"
      )),
      | None => {
        parse_atom(token, self.today)
          .map(Expr::Pred)
      }
    }
  }

  fn finish(
    &self
  ) -> anyhow::Result<()> {
    match self.tokens.get(self.pos) {
      | Some(token) => Err(anyhow!(
        "unexpected '{token}' in filter \
         expression"
      )),
      | None => Ok(())
    }
  }
}

fn collapse(
  mut nodes: Vec<Expr>,
  join: fn(Vec<Expr>) -> Expr
) -> Expr {
  if nodes.len() == 1 {
    nodes.remove(0)
  } else {
    join(nodes)
  }
}

fn lex_terms(
  terms: &[String]
) -> Vec<String> {
  let mut out = Vec::new();

  for term in terms {
    let mut current = String::new();
    for ch in term.chars() {
      if ch == '(' || ch == ')' {
        if !current.is_empty() {
          out.push(current.clone());
          current.clear();
        }
        out.push(ch.to_string());
      } else {
        current.push(ch);
      }
    }

    if !current.is_empty() {
      out.push(current);
    }
  }

  out
}

fn parse_date_arg(
  term: &str,
  value: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  parse_date_expr(value, today)
    .with_context(|| {
      format!(
        "invalid date in filter term \
         {term}"
      )
    })
}

fn parse_atom(
  term: &str,
  today: NaiveDate
) -> anyhow::Result<Pred> {
  if let Some(tag) =
    term.strip_prefix('+')
    && !tag.is_empty()
  {
    return Ok(Pred::TagInclude(
      tag.to_string()
    ));
  }
  if let Some(tag) =
    term.strip_prefix('-')
    && !tag.is_empty()
  {
    return Ok(Pred::TagExclude(
      tag.to_string()
    ));
  }

  if let Some(id) =
    term.strip_prefix("id:")
  {
    return Ok(Pred::Id(
      id.to_string()
    ));
  }

  if let Some(group) =
    term.strip_prefix("group:")
  {
    return Ok(Pred::GroupEq(
      group.to_string()
    ));
  }

  if let Some(kind_text) =
    term.strip_prefix("kind:")
  {
    return RecordKind::from_key(
      kind_text
    )
    .map(Pred::KindEq)
    .ok_or_else(|| {
      anyhow!(
        "unknown record kind in \
         filter: {kind_text}"
      )
    });
  }

  if let Some(value) =
    term.strip_prefix("starts.before:")
  {
    return Ok(Pred::StartsBefore(
      parse_date_arg(term, value, today)?
    ));
  }

  if let Some(value) =
    term.strip_prefix("starts.after:")
  {
    return Ok(Pred::StartsAfter(
      parse_date_arg(term, value, today)?
    ));
  }

  if let Some(value) =
    term.strip_prefix("ends.before:")
  {
    return Ok(Pred::EndsBefore(
      parse_date_arg(term, value, today)?
    ));
  }

  if let Some(value) =
    term.strip_prefix("ends.after:")
  {
    return Ok(Pred::EndsAfter(
      parse_date_arg(term, value, today)?
    ));
  }

  if let Some(value) =
    term.strip_prefix("active:")
  {
    return Ok(Pred::ActiveOn(
      parse_date_arg(term, value, today)?
    ));
  }

  Ok(Pred::TextContains(
    term.to_string()
  ))
}

fn eval_expr(
  expr: &Expr,
  record: &Record
) -> bool {
  match expr {
    | Expr::True => true,
    | Expr::Pred(pred) => {
      eval_pred(pred, record)
    }
    | Expr::And(nodes) => {
      nodes.iter().all(|node| {
        eval_expr(node, record)
      })
    }
    | Expr::Or(nodes) => {
      nodes.iter().any(|node| {
        eval_expr(node, record)
      })
    }
  }
}

fn eval_pred(
  pred: &Pred,
  record: &Record
) -> bool {
  let (first, last) = record.span();
  match pred {
    | Pred::Id(id) => record.id == *id,
    | Pred::TagInclude(tag) => {
      record.tags.iter().any(|t| t == tag)
    }
    | Pred::TagExclude(tag) => {
      !record.tags.iter().any(|t| t == tag)
    }
    | Pred::KindEq(kind) => {
      record.kind == *kind
    }
    | Pred::GroupEq(group) => {
      record.group.as_deref().is_some_and(
        |g| g.eq_ignore_ascii_case(group)
      )
    }
    | Pred::StartsBefore(date) => {
      first < *date
    }
    | Pred::StartsAfter(date) => {
      first > *date
    }
    | Pred::EndsBefore(date) => {
      last < *date
    }
    | Pred::EndsAfter(date) => {
      last > *date
    }
    | Pred::ActiveOn(date) => {
      record.is_active_on(*date)
    }
    | Pred::TextContains(text) => {
      record
        .title
        .to_lowercase()
        .contains(&text.to_lowercase())
    }
  }
}
