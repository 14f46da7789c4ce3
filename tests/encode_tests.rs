use std::collections::HashSet;
use std::fs;

use serde_json::json;

use fanout_core::call::{encode, encode_with, Call, EncodeOptions};

fn temp_file(name: &str, contents: &str) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("fanout-encode-tests-{name}"));
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_kwarg_insertion_order_never_affects_identifier() {
    let a = Call::new("useless_loop")
        .arg(10)
        .kwarg("arg1", 3)
        .kwarg("arg2", "b");
    let b = Call::new("useless_loop")
        .arg(10)
        .kwarg("arg2", "b")
        .kwarg("arg1", 3);
    assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
}

#[test]
fn test_distinct_calls_have_distinct_identifiers() {
    let mut ids = HashSet::new();
    let mut total = 0;

    for func in ["trial_function", "other_function"] {
        for x in 0..10 {
            for y in ["ok", "ok2", "w"] {
                for flag in [true, false] {
                    let call = Call::new(func)
                        .arg(x)
                        .arg(y)
                        .kwarg("arg1", flag)
                        .kwarg("arg2", x * 3);
                    ids.insert(encode(&call).unwrap());
                    total += 1;
                }
            }
        }
    }

    // a call with defaults omitted is distinct from one passing them
    ids.insert(encode(&Call::new("trial_function").arg(0).arg("ok")).unwrap());
    total += 1;

    assert_eq!(ids.len(), total);
}

#[test]
fn test_config_file_content_is_hashed_not_its_path() {
    let first = temp_file("config-a.ini", "alpha = 1\n");
    let second = temp_file("config-b.ini", "alpha = 1\n");
    let changed = temp_file("config-c.ini", "alpha = 2\n");

    let id_of = |path: &str| {
        encode(&Call::new("process").kwarg("config_file", path.to_string())).unwrap()
    };

    // same content under different paths collides
    assert_eq!(id_of(&first), id_of(&second));
    // same path shape, different content does not
    assert_ne!(id_of(&first), id_of(&changed));

    for path in [first, second, changed] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn test_unreadable_config_file_is_an_encoding_error() {
    let call = Call::new("process").kwarg("config_file", "/no/such/fanout-config.ini");
    let err = encode(&call).unwrap_err();
    assert!(err.to_string().contains("config file"));
}

#[test]
fn test_config_file_key_is_configurable() {
    let path = temp_file("config-d.ini", "beta = 3\n");
    let opts = EncodeOptions {
        config_file_key: "inifile".to_string(),
    };

    let by_path = Call::new("process").kwarg("inifile", path.clone());
    // under custom options the default key is an ordinary string argument
    let default_id = encode(&by_path).unwrap();
    let substituted_id = encode_with(&by_path, &opts).unwrap();
    assert_ne!(default_id, substituted_id);

    let _ = fs::remove_file(path);
}

#[test]
fn test_nested_object_arguments_hash_as_serialized() {
    // nested maps are not canonicalized beyond serde_json's own ordering;
    // equal objects therefore encode equally here, but callers must not rely
    // on insertion order tricks inside values
    let a = Call::new("f").arg(json!({"k": [1, 2], "m": {"x": 1}}));
    let b = Call::new("f").arg(json!({"m": {"x": 1}, "k": [1, 2]}));
    assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
}
