use super::types::{FilterExpression, FilterOperator, FilterQuery, ParameterValue};

// Longest tokens first so `!*` wins over `!` and `<=` over `<`.
const PREFIX_TOKENS: [(&str, FilterOperator); 8] = [
    ("!*", FilterOperator::NLike),
    ("<=", FilterOperator::Lte),
    (">=", FilterOperator::Gte),
    ("!", FilterOperator::Neq),
    ("=", FilterOperator::Eq),
    ("<", FilterOperator::Lt),
    (">", FilterOperator::Gt),
    ("*", FilterOperator::Like),
];

const SUFFIX_TOKEN: char = '*';
const WILDCARD: char = '%';

fn leading_token(text: &str) -> Option<(&'static str, FilterOperator)> {
    PREFIX_TOKENS
        .iter()
        .copied()
        .find(|(token, _)| text.starts_with(token))
}

/// Translate one raw parameter into a filter expression.
///
/// A leading token picks the operator; failing that a trailing `*` means
/// "contains"; otherwise the comparison is `eq` with the value untouched.
/// Operator-looking prefixes and trailing `*` are always stripped, and
/// `like`/`nlike` values are wrapped in `%` on both sides.
pub fn parse_parameter(field: impl Into<String>, raw: &ParameterValue) -> FilterExpression {
    let text = raw.to_string();

    let mut operator = leading_token(&text).map(|(_, op)| op);

    let mut value = text.as_str();
    while let Some((token, _)) = leading_token(value) {
        value = &value[token.len()..];
    }
    let trailing = value.ends_with(SUFFIX_TOKEN);
    value = value.trim_end_matches(SUFFIX_TOKEN);

    if operator.is_none() && trailing {
        operator = Some(FilterOperator::Like);
    }
    let operator = operator.unwrap_or(FilterOperator::Eq);

    let value = if operator.is_pattern() && !value.is_empty() {
        format!("{WILDCARD}{value}{WILDCARD}")
    } else {
        value.to_string()
    };

    FilterExpression::new(field, operator, value)
}

/// Build a query map from route parameters, skipping absent values.
pub fn to_query<I, K, V>(params: I) -> FilterQuery
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Into<String>,
    V: Into<ParameterValue>,
{
    params
        .into_iter()
        .filter_map(|(field, raw)| {
            let field = field.into();
            raw.map(|raw| {
                let expression = parse_parameter(field.clone(), &raw.into());
                (field, expression)
            })
        })
        .collect()
}
