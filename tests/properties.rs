// SPDX-License-Identifier: Apache-2.0

//! Property tests for template compilation, binding resolution and row skipping.

mod common;

use std::sync::Arc;

use futures::StreamExt;
use proptest::prelude::*;

use apifed_lib::binding::{resolve_inputs, resolve_outputs};
use apifed_lib::extract::XmlExtractor;
use apifed_lib::{
    ApiService, ApiTemplate, FederationError, Row, ServiceParams, TemplateRegistry, Value,
    Variable,
};

use common::{endpoint, pages_xml, MockTransport};

/// Renders a template definition with the given entry order.
fn render(params: &[(String, String)], vars: &[(String, String)], output_first: bool) -> String {
    let object = |entries: &[(String, String)]| {
        let body: Vec<String> = entries.iter().map(|(k, v)| format!("\"{k}\": {v}")).collect();
        format!("{{{}}}", body.join(", "))
    };
    let vars: Vec<(String, String)> = vars
        .iter()
        .map(|(k, path)| (k.clone(), format!("\"{path}\"")))
        .collect();
    let params = format!("\"params\": {}", object(params));
    let output = format!(
        "\"output\": {{\"items\": \"//page\", \"vars\": {}}}",
        object(&vars)
    );
    if output_first {
        format!("{{{output}, {params}}}")
    } else {
        format!("{{{params}, {output}}}")
    }
}

fn param_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,8}", 1..6).prop_map(|names| names.into_iter().collect())
}

fn param_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("\"query\"".to_string()),
        Just("42".to_string()),
        Just("{}".to_string()),
        Just("{\"default\": \"10\"}".to_string()),
    ]
}

proptest! {
    #[test]
    fn clash_between_input_and_output_is_always_rejected(
        names in param_names(),
        values in prop::collection::vec(param_value(), 6),
        clash in any::<prop::sample::Index>(),
        extra_outputs in prop::collection::vec("[A-Z]{1,6}", 0..3),
        output_first in any::<bool>(),
        shuffle_seed in any::<prop::sample::Index>(),
    ) {
        let params: Vec<(String, String)> = names
            .iter()
            .zip(values.iter())
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();

        let clashing = clash.get(&names).clone();
        let mut vars: Vec<(String, String)> = extra_outputs
            .iter()
            .map(|n| (n.clone(), "@title".to_string()))
            .collect();
        let at = shuffle_seed.index(vars.len() + 1);
        vars.insert(at, (clashing, "@title".to_string()));

        let json = render(&params, &vars, output_first);
        let err = ApiTemplate::from_json("T", &json).unwrap_err();
        prop_assert!(matches!(err, FederationError::Config { .. }), "{json}: {err:?}");
    }

    #[test]
    fn compile_and_resolve_are_idempotent(
        names in param_names(),
        values in prop::collection::vec(param_value(), 6),
        bind_all in any::<bool>(),
    ) {
        let params: Vec<(String, String)> = names
            .iter()
            .zip(values.iter())
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();
        let json = render(&params, &[("OUT".to_string(), "@title".to_string())], false);

        let a = ApiTemplate::from_json("T", &json).unwrap();
        let b = ApiTemplate::from_json("T", &json).unwrap();
        prop_assert_eq!(&a, &b);

        let mut call_site = ServiceParams::new().with_variable("OUT", Variable::named("o"));
        for input in a.input_params() {
            if bind_all || input.default.is_none() {
                call_site = call_site.with_constant(input.name.clone(), "x");
            }
        }
        prop_assert_eq!(
            resolve_inputs(&a, &call_site).unwrap(),
            resolve_inputs(&b, &call_site).unwrap()
        );
        prop_assert_eq!(
            resolve_outputs(&a, &call_site).unwrap(),
            resolve_outputs(&b, &call_site).unwrap()
        );
    }

    #[test]
    fn mandatory_input_needs_a_constant_or_variable(bind in 0u8..3) {
        let template = ApiTemplate::from_json(
            "T",
            r#"{"params": {"titles": {}, "limit": {"default": "5"}}, "output": {"items": "//page"}}"#,
        )
        .unwrap();
        let params = match bind {
            0 => ServiceParams::new(),
            1 => ServiceParams::new().with_constant("titles", "Albert Einstein"),
            _ => ServiceParams::new().with_variable("titles", Variable::named("t")),
        };
        let result = resolve_inputs(&template, &params);
        if bind == 0 {
            prop_assert!(
                matches!(result, Err(FederationError::InvalidInvocation { .. })),
                "{result:?}"
            );
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn empty_responses_drop_rows_and_keep_order(productive in prop::collection::vec(any::<bool>(), 0..12)) {
        let flags = productive.clone();
        let transport = MockTransport::new(move |request| {
            let index: usize = request.param("titles").and_then(|v| v.parse().ok()).unwrap_or(0);
            if flags[index] {
                Ok(pages_xml(&[format!("page {index}").as_str()]))
            } else {
                Ok(pages_xml(&[]))
            }
        });
        let service = ApiService::new(
            Arc::new(
                TemplateRegistry::from_json(
                    r#"{"Pages": {"params": {"titles": {}}, "output": {"items": "//page", "vars": {"title": "@title"}}}}"#,
                )
                .unwrap(),
            ),
            transport.clone(),
            Arc::new(XmlExtractor::new()),
            endpoint(),
        );
        let i = Variable::named("i");
        let call = service
            .create(
                "Pages",
                &ServiceParams::new()
                    .with_variable("titles", i.clone())
                    .with_variable("title", Variable::named("t")),
            )
            .unwrap();

        let input: Vec<Row> = (0..productive.len())
            .map(|n| Row::new().with(i.clone(), n.to_string()))
            .collect();
        let emitted: Vec<Option<Value>> = futures::executor::block_on(
            call.call(input)
                .into_stream()
                .map(|row| row.unwrap().get_by_name("t").cloned())
                .collect(),
        );

        let expected: Vec<Option<Value>> = productive
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(n, _)| Some(Value::text(format!("page {n}"))))
            .collect();
        prop_assert_eq!(emitted, expected);
        prop_assert_eq!(transport.calls(), productive.len());
    }
}
