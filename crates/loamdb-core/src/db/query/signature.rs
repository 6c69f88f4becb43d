use crate::{
    db::query::{
        plan::{OrderDirection, OrderSpec, PageSpec, PageRequest, SelectSpec},
        predicate::{ComparePredicate, CompareOp, Operand, Predicate},
    },
    error::InternalError,
    model::EntityModel,
    value::Value,
};
use convert_case::{Case, Casing};
use thiserror::Error as ThisError;

///
/// SignatureError
///
/// Derivation failures are fatal at startup: signatures are fixed at
/// compile time, so an unparsable one is a programming error, not input.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum SignatureError {
    #[error("signature '{0}' does not start with a recognized verb")]
    UnknownVerb(String),

    #[error("signature '{0}' has no 'By' keyword")]
    MissingByKeyword(String),

    #[error("entity '{entity}' has no property matching segment '{segment}'")]
    UnknownProperty { entity: String, segment: String },

    #[error("unexpected token '{token}' in signature '{signature}'")]
    UnexpectedToken { signature: String, token: String },

    #[error("result limit token '{0}' is out of range")]
    BadLimit(String),
}

impl From<SignatureError> for InternalError {
    fn from(err: SignatureError) -> Self {
        Self::unparsable_signature(err.to_string())
    }
}

///
/// QueryVerb
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryVerb {
    Find,
    Count,
    Delete,
}

///
/// QueryDescriptor
///
/// Parsed form of one derived-method signature: predicate tree with
/// positional parameter slots, explicit ordering, optional result limit.
/// Built once per signature, cached, reused across invocations.
///

#[derive(Clone, Debug, PartialEq)]
pub struct QueryDescriptor {
    pub signature: String,
    pub verb: QueryVerb,
    pub predicate: Predicate,
    pub order: OrderSpec,
    pub limit: Option<u32>,
    pub param_count: usize,
}

impl QueryDescriptor {
    /// Descriptor for an explicit (non-derived) query body; the predicate
    /// keeps its parameter slots and bypasses derivation entirely.
    #[must_use]
    pub fn custom(
        signature: impl Into<String>,
        predicate: Predicate,
        order: OrderSpec,
        limit: Option<u32>,
    ) -> Self {
        let param_count = predicate.param_count();

        Self {
            signature: signature.into(),
            verb: QueryVerb::Find,
            predicate,
            order,
            limit,
            param_count,
        }
    }

    /// Bind parameters and lower field names to storage columns, producing
    /// an executor-ready select.
    pub fn select_spec(
        &self,
        model: &EntityModel,
        params: &[Value],
    ) -> Result<SelectSpec, InternalError> {
        let predicate = self.bind_columns(model, params)?;
        let order = self.column_order(model, &self.order)?;

        let page = self.limit.map(|limit| PageSpec {
            limit: Some(limit),
            offset: 0,
        });

        Ok(SelectSpec {
            predicate,
            order,
            page,
            projection: None,
        })
    }

    /// Bind once, then emit a content select and a count predicate over the
    /// same bound compilation so the two cannot diverge.
    pub fn plan_page(
        &self,
        model: &EntityModel,
        params: &[Value],
        request: &PageRequest,
    ) -> Result<(SelectSpec, Predicate), InternalError> {
        let predicate = self.bind_columns(model, params)?;
        let order = self.column_order(model, &request.sort)?;

        let content = SelectSpec {
            predicate: predicate.clone(),
            order,
            page: Some(PageSpec {
                limit: Some(request.size),
                offset: request.offset(),
            }),
            projection: None,
        };

        Ok((content, predicate))
    }

    fn bind_columns(
        &self,
        model: &EntityModel,
        params: &[Value],
    ) -> Result<Predicate, InternalError> {
        if params.len() != self.param_count {
            return Err(InternalError::session_unsupported(format!(
                "signature '{}' takes {} parameters, {} supplied",
                self.signature,
                self.param_count,
                params.len()
            )));
        }

        let bound = self.predicate.bind(params)?;
        lower_fields(model, bound)
    }

    // Order specs are expressed over field names; storage sorts by column.
    // The primary key lands as final tiebreaker on every generated query.
    fn column_order(&self, model: &EntityModel, order: &OrderSpec) -> Result<OrderSpec, InternalError> {
        let mut lowered = OrderSpec::none();
        for (field, direction) in &order.fields {
            let column = model.column_for(field).ok_or_else(|| {
                InternalError::mapping(format!(
                    "entity '{}' has no field '{field}' to order by",
                    model.entity_name
                ))
            })?;
            lowered = lowered.then(column, *direction);
        }

        let pk_column = model.column_for(model.primary_key).unwrap_or(model.primary_key);
        lowered.push_tiebreaker(pk_column);

        Ok(lowered)
    }
}

/// Rewrite predicate field names to their storage columns.
pub(crate) fn lower_fields(
    model: &EntityModel,
    predicate: Predicate,
) -> Result<Predicate, InternalError> {
    let lowered = match predicate {
        Predicate::True => Predicate::True,
        Predicate::False => Predicate::False,
        Predicate::And(children) => Predicate::And(
            children
                .into_iter()
                .map(|child| lower_fields(model, child))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Predicate::Or(children) => Predicate::Or(
            children
                .into_iter()
                .map(|child| lower_fields(model, child))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Predicate::Not(inner) => Predicate::Not(Box::new(lower_fields(model, *inner)?)),
        Predicate::Compare(cmp) => Predicate::Compare(ComparePredicate {
            field: lower_field_name(model, &cmp.field)?,
            op: cmp.op,
            operand: cmp.operand,
        }),
        Predicate::IsNull { field } => Predicate::IsNull {
            field: lower_field_name(model, &field)?,
        },
        Predicate::IsNotNull { field } => Predicate::IsNotNull {
            field: lower_field_name(model, &field)?,
        },
    };

    Ok(lowered)
}

fn lower_field_name(model: &EntityModel, field: &str) -> Result<String, InternalError> {
    model
        .column_for(field)
        .map(ToString::to_string)
        .ok_or_else(|| {
            InternalError::mapping(format!(
                "entity '{}' has no field '{field}'",
                model.entity_name
            ))
        })
}

///
/// Derivation
///

// Operator keywords, longest token sequence first; the first match wins.
const OPERATOR_KEYWORDS: &[(&[&str], OpKeyword)] = &[
    (&["Greater", "Than", "Equal"], OpKeyword::Gte),
    (&["Less", "Than", "Equal"], OpKeyword::Lte),
    (&["Is", "Not", "Null"], OpKeyword::IsNotNull),
    (&["Greater", "Than"], OpKeyword::Gt),
    (&["Less", "Than"], OpKeyword::Lt),
    (&["Starting", "With"], OpKeyword::StartsWith),
    (&["Ending", "With"], OpKeyword::EndsWith),
    (&["Not", "Null"], OpKeyword::IsNotNull),
    (&["Is", "Null"], OpKeyword::IsNull),
    (&["Not", "In"], OpKeyword::NotIn),
    (&["Between"], OpKeyword::Between),
    (&["Containing"], OpKeyword::Contains),
    (&["Contains"], OpKeyword::Contains),
    (&["Null"], OpKeyword::IsNull),
    (&["Not"], OpKeyword::Ne),
    (&["In"], OpKeyword::In),
    (&["True"], OpKeyword::True),
    (&["False"], OpKeyword::False),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum OpKeyword {
    Gte,
    Lte,
    Gt,
    Lt,
    StartsWith,
    EndsWith,
    IsNotNull,
    IsNull,
    NotIn,
    Between,
    Contains,
    Ne,
    In,
    True,
    False,
}

/// Parse a derived-method signature against an entity model.
pub fn derive(model: &EntityModel, signature: &str) -> Result<QueryDescriptor, SignatureError> {
    let tokens = tokenize(signature);

    let verb = match tokens.first().map(String::as_str) {
        Some("find" | "get" | "read" | "query") => QueryVerb::Find,
        Some("count") => QueryVerb::Count,
        Some("delete" | "remove") => QueryVerb::Delete,
        _ => return Err(SignatureError::UnknownVerb(signature.to_string())),
    };

    let mut parser = Parser {
        model,
        signature,
        tokens: &tokens[1..],
        pos: 0,
        next_param: 0,
    };

    let limit = parser.parse_subject()?;
    let predicate = parser.parse_predicate()?;
    let order = parser.parse_order()?;

    if let Some(token) = parser.peek() {
        return Err(SignatureError::UnexpectedToken {
            signature: signature.to_string(),
            token: token.to_string(),
        });
    }

    let param_count = parser.next_param;

    Ok(QueryDescriptor {
        signature: signature.to_string(),
        verb,
        predicate,
        order,
        limit,
        param_count,
    })
}

// Case-boundary tokenizer: a new token starts at each uppercase letter;
// digits extend the current token ("Top3" stays one token).
fn tokenize(signature: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for c in signature.chars() {
        if c.is_uppercase() || tokens.is_empty() {
            tokens.push(String::new());
        }
        // unwrap is safe: a token was pushed above when empty
        tokens.last_mut().unwrap().push(c);
    }

    tokens
}

struct Parser<'a> {
    model: &'a EntityModel,
    signature: &'a str,
    tokens: &'a [String],
    pos: usize,
    next_param: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn at_order_by(&self) -> bool {
        self.tokens.get(self.pos).map(String::as_str) == Some("Order")
            && self.tokens.get(self.pos + 1).map(String::as_str) == Some("By")
    }

    fn bump(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).map(String::as_str);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // Subject tokens before 'By' are noise except result-limit markers.
    fn parse_subject(&mut self) -> Result<Option<u32>, SignatureError> {
        let mut limit = None;

        loop {
            match self.bump() {
                Some("By") => return Ok(limit),
                Some(token) => {
                    if let Some(parsed) = parse_limit_token(token)? {
                        limit = Some(parsed);
                    }
                }
                None => {
                    return Err(SignatureError::MissingByKeyword(self.signature.to_string()));
                }
            }
        }
    }

    // Conditions split on Or into groups of And-joined conditions.
    fn parse_predicate(&mut self) -> Result<Predicate, SignatureError> {
        if self.peek().is_none() || self.at_order_by() {
            return Ok(Predicate::True);
        }

        let mut groups: Vec<Vec<Predicate>> = vec![Vec::new()];

        loop {
            let condition = self.parse_condition()?;
            // unwrap is safe: groups is never empty
            groups.last_mut().unwrap().push(condition);

            if self.peek().is_none() || self.at_order_by() {
                break;
            }

            match self.bump() {
                Some("And") => {}
                Some("Or") => groups.push(Vec::new()),
                Some(token) => {
                    return Err(SignatureError::UnexpectedToken {
                        signature: self.signature.to_string(),
                        token: token.to_string(),
                    });
                }
                None => break,
            }
        }

        let mut disjuncts: Vec<Predicate> = groups
            .into_iter()
            .map(|mut conjuncts| {
                if conjuncts.len() == 1 {
                    // unwrap is safe: length checked
                    conjuncts.pop().unwrap()
                } else {
                    Predicate::And(conjuncts)
                }
            })
            .collect();

        if disjuncts.len() == 1 {
            // unwrap is safe: length checked
            Ok(disjuncts.pop().unwrap())
        } else {
            Ok(Predicate::Or(disjuncts))
        }
    }

    fn parse_condition(&mut self) -> Result<Predicate, SignatureError> {
        let field = self.parse_property()?;
        let keyword = self.parse_operator();

        let condition = match keyword {
            None => self.param_leaf(&field, CompareOp::Eq),
            Some(OpKeyword::Gt) => self.param_leaf(&field, CompareOp::Gt),
            Some(OpKeyword::Gte) => self.param_leaf(&field, CompareOp::Gte),
            Some(OpKeyword::Lt) => self.param_leaf(&field, CompareOp::Lt),
            Some(OpKeyword::Lte) => self.param_leaf(&field, CompareOp::Lte),
            Some(OpKeyword::Ne) => self.param_leaf(&field, CompareOp::Ne),
            Some(OpKeyword::In) => self.param_leaf(&field, CompareOp::In),
            Some(OpKeyword::NotIn) => self.param_leaf(&field, CompareOp::NotIn),
            Some(OpKeyword::Contains) => self.param_leaf(&field, CompareOp::Contains),
            Some(OpKeyword::StartsWith) => self.param_leaf(&field, CompareOp::StartsWith),
            Some(OpKeyword::EndsWith) => self.param_leaf(&field, CompareOp::EndsWith),
            Some(OpKeyword::Between) => {
                let lower = self.param_leaf(&field, CompareOp::Gte);
                let upper = self.param_leaf(&field, CompareOp::Lte);
                Predicate::And(vec![lower, upper])
            }
            Some(OpKeyword::IsNull) => Predicate::is_null(field),
            Some(OpKeyword::IsNotNull) => Predicate::is_not_null(field),
            Some(OpKeyword::True) => Predicate::eq(field, Operand::Value(Value::Bool(true))),
            Some(OpKeyword::False) => Predicate::eq(field, Operand::Value(Value::Bool(false))),
        };

        Ok(condition)
    }

    fn param_leaf(&mut self, field: &str, op: CompareOp) -> Predicate {
        let operand = Operand::param(self.next_param);
        self.next_param += 1;

        Predicate::Compare(ComparePredicate::new(field, op, operand))
    }

    // Longest-match against declared field and relation names; falls back to
    // the greedy case-boundary segment, which then fails as unknown.
    fn parse_property(&mut self) -> Result<String, SignatureError> {
        let remaining = &self.tokens[self.pos..];
        if remaining.is_empty() {
            return Err(SignatureError::UnexpectedToken {
                signature: self.signature.to_string(),
                token: "<end>".to_string(),
            });
        }

        for take in (1..=remaining.len()).rev() {
            let candidate = remaining[..take].concat();
            if let Some(name) = self.match_property(&candidate) {
                self.pos += take;
                return Ok(name.to_string());
            }
        }

        // Greedy fallback: everything up to the next structural keyword is
        // one property segment; report it whole.
        let mut take = 0;
        while take < remaining.len() {
            if matches!(remaining[take].as_str(), "And" | "Or")
                || (remaining[take] == "Order"
                    && remaining.get(take + 1).map(String::as_str) == Some("By"))
            {
                break;
            }
            take += 1;
        }

        Err(SignatureError::UnknownProperty {
            entity: self.model.entity_name.to_string(),
            segment: remaining[..take].concat(),
        })
    }

    fn match_property(&self, candidate: &str) -> Option<&'static str> {
        self.model
            .fields
            .iter()
            .map(|f| f.name)
            .chain(self.model.relations.iter().map(|r| r.field))
            .find(|name| name.to_case(Case::Pascal) == candidate)
    }

    fn parse_operator(&mut self) -> Option<OpKeyword> {
        let remaining = &self.tokens[self.pos..];

        for (sequence, keyword) in OPERATOR_KEYWORDS {
            if sequence.len() <= remaining.len()
                && sequence
                    .iter()
                    .zip(remaining)
                    .all(|(expected, actual)| *expected == actual)
            {
                self.pos += sequence.len();
                return Some(*keyword);
            }
        }

        None
    }

    fn parse_order(&mut self) -> Result<OrderSpec, SignatureError> {
        if !self.at_order_by() {
            return Ok(OrderSpec::none());
        }
        self.pos += 2;

        let mut order = OrderSpec::none();
        while self.peek().is_some() {
            let field = self.parse_property()?;
            let direction = match self.peek() {
                Some("Asc") => {
                    self.pos += 1;
                    OrderDirection::Asc
                }
                Some("Desc") => {
                    self.pos += 1;
                    OrderDirection::Desc
                }
                _ => OrderDirection::Asc,
            };
            order = order.then(field, direction);
        }

        Ok(order)
    }
}

fn parse_limit_token(token: &str) -> Result<Option<u32>, SignatureError> {
    let digits = if let Some(rest) = token.strip_prefix("Top") {
        rest
    } else if let Some(rest) = token.strip_prefix("First") {
        rest
    } else {
        return Ok(None);
    };

    if digits.is_empty() {
        return Ok(Some(1));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Ok(None);
    }

    digits
        .parse::<u32>()
        .map(Some)
        .map_err(|_| SignatureError::BadLimit(token.to_string()))
}

///
/// TESTS
///
