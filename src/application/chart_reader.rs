// Chart reader - current doughnut slices as a ChartReading
use crate::application::page_driver::PageDriver;
use crate::domain::chart::ChartReading;
use crate::error::ScrapeError;
use serde_json::Value;

pub const DEFAULT_SLICE_SELECTOR: &str = ".js-plotly-plot g.slice";

/// Script returning the trimmed label text of every slice matching `slice_selector`
pub fn slice_text_script(slice_selector: &str) -> String {
    // serde_json gives us a correctly escaped JS string literal
    let selector = Value::String(slice_selector.to_string()).to_string();
    format!(
        r#"
        var slices = document.querySelectorAll({selector});
        var texts = [];
        slices.forEach(function (slice) {{
            var textEl = slice.querySelector('g.slicetext text');
            if (textEl) {{
                texts.push(textEl.textContent.trim());
            }}
        }});
        return texts;
        "#
    )
}

pub async fn read_chart(
    driver: &dyn PageDriver,
    slice_selector: &str,
) -> Result<ChartReading, ScrapeError> {
    let result = driver.execute(&slice_text_script(slice_selector), &[]).await?;

    let texts: Vec<String> = match result {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("Unexpected slice script result: {}", other);
            Vec::new()
        }
    };

    Ok(ChartReading::from_slice_texts(&texts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_text_script_escapes_selector() {
        let script = slice_text_script(r#"div[data-name="x"] g.slice"#);
        assert!(script.contains(r#"document.querySelectorAll("div[data-name=\"x\"] g.slice")"#));
        assert!(script.contains("return texts;"));
    }
}
