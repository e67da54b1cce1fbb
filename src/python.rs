use std::future::Future;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::Config;
use crate::consolidate::ScrapedProduct;
use crate::fetcher;
use crate::freeform::{self, ParseResult, ProductText};
use crate::logging;
use crate::scrape::{ScrapeRequest, ScrapeResponse, Scraper};
use crate::vocab;

fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    Ok(runtime.block_on(future))
}

fn product_dict<'py>(py: Python<'py>, product: ScrapedProduct) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("name", product.name)?;
    dict.set_item("brand", product.brand)?;
    dict.set_item("color_raw", product.color_raw)?;
    dict.set_item("type", product.article_type)?;
    dict.set_item("price", product.price)?;
    dict.set_item("currency", product.currency)?;
    dict.set_item("image_url", product.image_url)?;
    dict.set_item("images", product.images)?;
    Ok(dict)
}

fn parse_result_dict(py: Python<'_>, result: ParseResult) -> PyResult<PyObject> {
    let dict = PyDict::new_bound(py);
    dict.set_item("type", result.article_type.map(|a| a.as_str()))?;
    dict.set_item("color", result.color.map(|c| c.to_string()))?;

    let confidence = PyDict::new_bound(py);
    confidence.set_item("type", result.confidence.article_type)?;
    confidence.set_item("color", result.confidence.color)?;
    dict.set_item("confidence", confidence)?;
    Ok(dict.into())
}

/// Scrapes `url` and returns the response envelope as a dict. Failures are
/// reported in the dict (`error`, `hint`, `status`), not raised.
#[pyfunction]
#[pyo3(signature = (url, force=None))]
fn scrape_url(py: Python, url: String, force: Option<String>) -> PyResult<PyObject> {
    let response = py
        .allow_threads(|| {
            let scraper = Scraper::from_env().map_err(|e| e.to_string())?;
            block_on(scraper.handle(ScrapeRequest {
                url: Some(url),
                force,
            }))
        })
        .map_err(PyRuntimeError::new_err)?;

    let status = response.status_code();
    let dict = PyDict::new_bound(py);
    match response {
        ScrapeResponse::Ok {
            product, path_used, ..
        } => {
            dict.set_item("ok", true)?;
            dict.set_item("product", product_dict(py, product)?)?;
            dict.set_item("path_used", path_used.as_str())?;
        }
        ScrapeResponse::Err { error, hint, .. } => {
            dict.set_item("ok", false)?;
            dict.set_item("error", error)?;
            dict.set_item("hint", hint)?;
        }
    }
    dict.set_item("status", status)?;
    Ok(dict.into())
}

#[pyfunction]
fn headless_health(py: Python) -> PyResult<PyObject> {
    let report = py
        .allow_threads(|| block_on(fetcher::headless_health(&Config::from_env())))
        .map_err(PyRuntimeError::new_err)?;
    let dict = PyDict::new_bound(py);
    dict.set_item("ok", report.ok)?;
    dict.set_item("status", report.status)?;
    dict.set_item("reason", report.reason)?;
    Ok(dict.into())
}

#[pyfunction]
fn parse_freeform(py: Python, text: &str) -> PyResult<PyObject> {
    parse_result_dict(py, freeform::parse_freeform(text))
}

#[pyfunction]
fn parse_product(py: Python, product_json: &str) -> PyResult<PyObject> {
    let input: ProductText = serde_json::from_str(product_json)
        .map_err(|e| PyValueError::new_err(format!("invalid product JSON: {}", e)))?;
    parse_result_dict(py, freeform::parse_from_product(&input))
}

#[pyfunction]
fn to_canon_color(text: &str) -> Option<&'static str> {
    vocab::to_canon_color(text).map(|c| c.as_str())
}

#[pyfunction]
fn to_multi_color(text: &str) -> Option<String> {
    vocab::to_multi_color(text)
}

#[pyfunction]
fn to_canon_article(text: &str) -> Option<&'static str> {
    vocab::to_canon_article(text).map(|a| a.as_str())
}

#[pymodule]
fn garment_scraper(m: &Bound<'_, PyModule>) -> PyResult<()> {
    logging::init();
    m.add_function(wrap_pyfunction!(scrape_url, m)?)?;
    m.add_function(wrap_pyfunction!(headless_health, m)?)?;
    m.add_function(wrap_pyfunction!(parse_freeform, m)?)?;
    m.add_function(wrap_pyfunction!(parse_product, m)?)?;
    m.add_function(wrap_pyfunction!(to_canon_color, m)?)?;
    m.add_function(wrap_pyfunction!(to_multi_color, m)?)?;
    m.add_function(wrap_pyfunction!(to_canon_article, m)?)?;
    Ok(())
}
