use crate::errors::AppError;
use crate::models::{CriterionOperator, CriterionValue, ScreenerCriteria, StockData};

const EQ_TOLERANCE: f64 = 1e-9;

enum FieldValue<'a> {
    Number(Option<f64>),
    Text(Option<&'a str>),
}

// Accepts both snake_case and the camelCase names the web client sends.
fn field_value<'a>(stock: &'a StockData, field: &str) -> Option<FieldValue<'a>> {
    let value = match field {
        "price" => FieldValue::Number(Some(stock.price)),
        "volume" => FieldValue::Number(Some(stock.volume as f64)),
        "market_cap" | "marketCap" => FieldValue::Number(stock.market_cap),
        "pe_ratio" | "peRatio" => FieldValue::Number(stock.pe_ratio),
        "eps" => FieldValue::Number(stock.eps),
        "beta" => FieldValue::Number(stock.beta),
        "fifty_two_week_high" | "fiftyTwoWeekHigh" => FieldValue::Number(stock.fifty_two_week_high),
        "fifty_two_week_low" | "fiftyTwoWeekLow" => FieldValue::Number(stock.fifty_two_week_low),
        "day_high" | "dayHigh" => FieldValue::Number(stock.day_high),
        "day_low" | "dayLow" => FieldValue::Number(stock.day_low),
        "rsi14" | "rsi_14" => FieldValue::Number(stock.rsi14),
        "symbol" => FieldValue::Text(Some(stock.symbol.as_str())),
        "company_name" | "companyName" => FieldValue::Text(Some(stock.company_name.as_str())),
        "sector" => FieldValue::Text(stock.sector.as_deref()),
        "industry" => FieldValue::Text(stock.industry.as_deref()),
        _ => return None,
    };
    Some(value)
}

fn is_numeric_field(field: &str) -> Option<bool> {
    // Any stock works for classifying the field name
    let probe = StockData {
        symbol: String::new(),
        company_name: String::new(),
        price: 0.0,
        volume: 0,
        market_cap: None,
        pe_ratio: None,
        eps: None,
        sector: None,
        industry: None,
        beta: None,
        fifty_two_week_high: None,
        fifty_two_week_low: None,
        day_high: None,
        day_low: None,
        rsi14: None,
    };
    field_value(&probe, field).map(|v| matches!(v, FieldValue::Number(_)))
}

/// Rejects unknown fields and operator/value combinations that cannot apply.
pub fn validate_criterion(criterion: &ScreenerCriteria) -> Result<(), AppError> {
    let numeric = is_numeric_field(&criterion.field).ok_or_else(|| {
        AppError::Validation(format!("Unknown screener field '{}'", criterion.field))
    })?;

    let valid = match (numeric, criterion.operator, &criterion.value) {
        (true, CriterionOperator::Gt | CriterionOperator::Lt | CriterionOperator::Eq, CriterionValue::Number(v)) => v.is_finite(),
        (true, CriterionOperator::Between, CriterionValue::Range([lo, hi])) => lo.is_finite() && hi.is_finite(),
        (false, CriterionOperator::Eq | CriterionOperator::Contains, CriterionValue::Text(_)) => true,
        _ => false,
    };

    if !valid {
        return Err(AppError::Validation(format!(
            "Operator {:?} cannot compare field '{}' with {:?}",
            criterion.operator, criterion.field, criterion.value
        )));
    }
    Ok(())
}

/// Whether `stock` satisfies `criterion`. Unknown values never match.
pub fn matches_criterion(stock: &StockData, criterion: &ScreenerCriteria) -> Result<bool, AppError> {
    validate_criterion(criterion)?;

    let field = field_value(stock, &criterion.field)
        .ok_or_else(|| AppError::Validation(format!("Unknown screener field '{}'", criterion.field)))?;

    let matched = match (field, criterion.operator, &criterion.value) {
        (FieldValue::Number(Some(x)), CriterionOperator::Gt, CriterionValue::Number(v)) => x > *v,
        (FieldValue::Number(Some(x)), CriterionOperator::Lt, CriterionValue::Number(v)) => x < *v,
        (FieldValue::Number(Some(x)), CriterionOperator::Eq, CriterionValue::Number(v)) => (x - v).abs() < EQ_TOLERANCE,
        (FieldValue::Number(Some(x)), CriterionOperator::Between, CriterionValue::Range([a, b])) => {
            x >= a.min(*b) && x <= a.max(*b)
        }
        (FieldValue::Text(Some(s)), CriterionOperator::Eq, CriterionValue::Text(v)) => s.eq_ignore_ascii_case(v),
        (FieldValue::Text(Some(s)), CriterionOperator::Contains, CriterionValue::Text(v)) => {
            s.to_lowercase().contains(&v.to_lowercase())
        }
        _ => false,
    };

    Ok(matched)
}

/// Keeps the stocks that satisfy every criterion.
pub fn screen_stocks(stocks: Vec<StockData>, criteria: &[ScreenerCriteria]) -> Result<Vec<StockData>, AppError> {
    for criterion in criteria {
        validate_criterion(criterion)?;
    }

    let mut passed = Vec::with_capacity(stocks.len());
    for stock in stocks {
        let mut keep = true;
        for criterion in criteria {
            if !matches_criterion(&stock, criterion)? {
                keep = false;
                break;
            }
        }
        if keep {
            passed.push(stock);
        }
    }
    Ok(passed)
}

/// Human readable form used in alert emails, e.g. `price > 100`.
pub fn describe_criterion(criterion: &ScreenerCriteria) -> String {
    let op = match criterion.operator {
        CriterionOperator::Gt => ">",
        CriterionOperator::Lt => "<",
        CriterionOperator::Eq => "=",
        CriterionOperator::Between => "between",
        CriterionOperator::Contains => "contains",
    };
    let value = match &criterion.value {
        CriterionValue::Number(v) => format!("{}", v),
        CriterionValue::Text(s) => format!("\"{}\"", s),
        CriterionValue::Range([lo, hi]) => format!("{} and {}", lo, hi),
    };
    format!("{} {} {}", criterion.field, op, value)
}
