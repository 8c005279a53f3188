use anyhow::{Context, Result, anyhow};
use jaq_core::{Compiler, Ctx, RcIter, compile::Undefined, load};
use jaq_json::Val;
use serde_json::Value;

/// Run a jq program over one document. Each output becomes its own value.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(format_parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let it = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    for item in it {
        let v = item.map_err(|e| anyhow!("jq runtime error: {e:?}"))?;
        // Val renders as JSON text
        let text = v.to_string();
        out.push(serde_json::from_str(&text).with_context(|| format!("jq output is not JSON: {text}"))?);
    }
    Ok(out)
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, err) in errs {
        s.push_str(&format!("parse error: {err:?} in `{}`\n", file.code));
    }
    anyhow!(s)
}

fn format_undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            s.push_str(&format!("undefined `{name}`: {undef:?} in `{}`\n", file.code));
        }
    }
    anyhow!(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_a_bundle_into_universe_documents() {
        let bundle = json!({ "files": [{ "types": [] }, { "types": [{ "name": "A", "kind": "class" }] }] });
        let out = run_jaq(".files[]", &bundle).unwrap();
        assert_eq!(out, vec![json!({ "types": [] }), json!({ "types": [{ "name": "A", "kind": "class" }] })]);
    }

    #[test]
    fn parse_errors_are_reported() {
        assert!(run_jaq(".[", &json!(null)).is_err());
    }
}
