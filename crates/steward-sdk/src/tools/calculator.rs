//! Basic statistics over a list of numbers

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use steward_core::types::ActionResult;

use super::{Tool, ToolKind, ToolParams, parse_params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Average,
    Sum,
    Min,
    Max,
}

impl Operation {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "average" | "avg" | "mean" => Some(Self::Average),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// `numbers` must be non-empty
    fn apply(self, numbers: &[f64]) -> f64 {
        match self {
            Self::Average => numbers.iter().sum::<f64>() / numbers.len() as f64,
            Self::Sum => numbers.iter().sum(),
            Self::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalculatorRequest {
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    numbers: Value,
}

/// Accepts `[1, 2]`, `["1", "2"]` or `"1, 2"`.
fn collect_numbers(value: &Value) -> Result<Vec<f64>, String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("Not a number: {}", s.trim()))
    };

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Number(n) => Ok(n.as_f64().into_iter().collect()),
        Value::String(s) => s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(parse)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Number(n) => n.as_f64().ok_or_else(|| format!("Not a number: {}", n)),
                Value::String(s) => parse(s),
                other => Err(format!("Not a number: {}", other)),
            })
            .collect(),
        other => Err(format!("Not a number: {}", other)),
    }
}

/// Calculator tool
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Analysis
    }

    fn describe(&self) -> String {
        "Basic statistics over a list of numbers. Parameters: operation (average, sum, min, max; \
         default average), numbers (list of numbers)"
            .to_string()
    }

    async fn execute(&self, params: &ToolParams) -> ActionResult {
        let request: CalculatorRequest = match parse_params(params) {
            Ok(request) => request,
            Err(message) => return ActionResult::error(message),
        };

        let numbers = match collect_numbers(&request.numbers) {
            Ok(numbers) if numbers.is_empty() => return ActionResult::error("Numbers are required"),
            Ok(numbers) => numbers,
            Err(message) => return ActionResult::error(message),
        };

        let name = request.operation.unwrap_or_else(|| "average".to_string());
        let Some(operation) = Operation::parse(&name) else {
            return ActionResult::error(format!("Unknown operation: {}", name));
        };

        ActionResult::success()
            .with_field("operation", name.trim().to_ascii_lowercase())
            .with_field("result", operation.apply(&numbers))
    }
}
