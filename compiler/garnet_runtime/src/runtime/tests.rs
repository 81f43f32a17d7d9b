#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Tests use unwrap for brevity"
)]

use std::path::{Path, PathBuf};

use garnet_value::{ControlAction, EvalError, EvalErrorKind, Value};
use pretty_assertions::assert_eq;

use super::*;
use crate::output::buffer_stream;
use crate::parser::{ParseOutput, Parser};
use crate::silent_stream;

fn runtime() -> Runtime {
    RuntimeBuilder::new()
        .error_stream(silent_stream())
        .build_initialized()
}

// Init

#[test]
fn init_installs_base_context() {
    let rt = runtime();
    assert!(rt.is_initialized());
    assert_eq!(rt.frame_depth(), 1);
    assert_eq!(rt.scope_depth(), 1);
    assert_eq!(rt.iter_depth(), 1);
    assert_eq!(rt.block_depth(), 0);
    assert_eq!(rt.class_depth(), 0);
    assert_eq!(rt.current_iter(), Iter::Not);
    assert!(!rt.is_block_given());
    assert_eq!(rt.method_scope(), Visibility::Private);
    assert!(rt.is_scope(Visibility::Private));
    assert_eq!(rt.current_class(), Some(rt.object_class()));
    assert_eq!(rt.cbase(), Some(rt.object_class()));
}

#[test]
fn set_cbase_rebinds_the_current_namespace_in_place() {
    let mut rt = runtime();
    let before = rt.current_namespace().unwrap();
    let geometry = rt.define_module("Geometry");
    geometry.define_constant("K", Value::int(7));

    rt.set_cbase(geometry.clone());

    assert_eq!(rt.cbase(), Some(geometry.clone()));
    let after = rt.current_namespace().unwrap();
    assert!(Shared::ptr_eq(&after, &before));
    assert_eq!(after.borrow().module().clone(), geometry);
    assert_eq!(rt.lookup_constant("K"), Some(Value::int(7)));
    assert_eq!(
        rt.top_namespace().unwrap().borrow().module().clone(),
        geometry
    );
}

#[test]
fn top_level_objects_are_consistent() {
    let rt = runtime();
    let top_frame = rt.top_frame().unwrap().clone();
    assert!(Shared::ptr_eq(&top_frame, &rt.current_frame()));
    assert!(top_frame.borrow().self_value.same(rt.top_self()));
    assert!(Shared::ptr_eq(rt.top_scope().unwrap(), &rt.current_scope()));
    assert!(Shared::ptr_eq(
        rt.top_namespace().unwrap(),
        &rt.current_namespace().unwrap()
    ));
    assert_eq!(rt.class_of(rt.top_self()), rt.object_class());
}

#[test]
fn init_is_idempotent() {
    let mut rt = runtime();
    let top_self = rt.top_self().clone();
    rt.init();
    assert_eq!(rt.frame_depth(), 1);
    assert!(rt.top_self().same(&top_self));
}

#[test]
#[should_panic(expected = "popped past its base entry")]
fn popping_the_top_frame_is_an_invariant_violation() {
    let mut rt = runtime();
    rt.pop_frame();
}

// Classes

#[test]
fn immediates_have_fixed_classes() {
    let rt = runtime();
    let core = rt.core();
    assert_eq!(rt.class_of(&Value::Nil), core.nil_class);
    assert_eq!(rt.class_of(&Value::bool(true)), core.true_class);
    assert_eq!(rt.class_of(&Value::bool(false)), core.false_class);
    assert_eq!(rt.class_of(&Value::int(1)), core.integer);
    assert_eq!(rt.class_of(&Value::string("s")), core.string);
    assert_eq!(rt.class_of(&Value::module(&core.kernel)), core.module);
    assert_eq!(rt.class_of(&Value::module(&core.object)), core.class);
}

#[test]
fn nil_true_and_false_are_singletons() {
    let rt = runtime();
    assert!(rt.nil_value().same(&rt.nil_value()));
    assert!(rt.true_value().same(&rt.true_value()));
    assert!(rt.false_value().same(&rt.false_value()));
    assert!(!rt.true_value().same(&rt.false_value()));
    assert!(!rt.nil_value().is_truthy());
}

#[test]
fn define_class_defaults_to_object() {
    let mut rt = runtime();
    let point = rt.define_class("Point", None);
    assert_eq!(point.superclass(), Some(&rt.object_class()));
    assert!(rt.is_class_defined("Point"));
    assert_eq!(rt.get_class("Point"), Some(point.clone()));
    assert_eq!(rt.get_top_constant("Point"), Some(Value::module(&point)));
}

#[test]
fn define_class_by_name_resolves_superclass() {
    let mut rt = runtime();
    let shape = rt.define_class("Shape", None);
    let circle = rt.define_class_by_name("Circle", "Shape").unwrap();
    assert!(circle.inherits_from(&shape));
}

#[test]
fn define_class_by_name_rejects_unknown_superclass() {
    let mut rt = runtime();
    let err = rt.define_class_by_name("Circle", "Nope").unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UnknownSuperclass {
            name: "Nope".to_string()
        }
    );
    assert!(!rt.is_class_defined("Circle"));
}

#[test]
fn modules_are_not_classes() {
    let mut rt = runtime();
    let util = rt.define_module("Util");
    assert_eq!(rt.get_module("Util"), Some(util));
    assert_eq!(rt.get_class("Util"), None);
    assert_eq!(rt.get_class("Kernel"), None);
}

#[test]
fn global_constants_live_on_object() {
    let mut rt = runtime();
    rt.define_global_constant("VERSION", Value::string("1.0"));
    assert_eq!(rt.get_top_constant("VERSION"), Some(Value::string("1.0")));
    assert_eq!(rt.lookup_constant("VERSION"), Some(Value::string("1.0")));
    assert_eq!(rt.get_top_constant("MISSING"), None);
}

#[test]
fn exception_class_of_error() {
    let rt = runtime();
    let err = garnet_value::no_block_given();
    assert_eq!(
        rt.exception_class_of(&err),
        Some(rt.exceptions().local_jump_error.clone())
    );
}

// Globals

#[test]
fn default_globals() {
    let mut rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .verbose(true)
        .script_name("app.rb")
        .build_initialized();
    assert_eq!(rt.global_get("$/"), Value::string("\n"));
    assert_eq!(rt.global_get("$,"), Value::Nil);
    assert_eq!(rt.global_get("$VERBOSE"), Value::bool(true));
    assert_eq!(rt.global_get("$DEBUG"), Value::bool(false));
    assert_eq!(rt.global_get("$0"), Value::string("app.rb"));
    assert_eq!(
        rt.global_get("$$"),
        Value::int(i64::from(std::process::id()))
    );
    assert!(rt.verbose());
}

#[test]
fn load_path_alias_shares_the_array() {
    let mut rt = runtime();
    let load_path = rt.global_get("$:");
    assert!(load_path.same(&rt.global_get("$LOAD_PATH")));
    assert_eq!(load_path.array_items().unwrap().last(), Some(&Value::string(".")));
}

#[test]
fn read_only_globals_reject_writes() {
    let mut rt = runtime();
    let err = rt.global_set("$0", Value::string("x")).unwrap_err();
    assert_eq!(err.message, "$0 is a read-only variable");
    assert_eq!(err.exception_class(), "NameError");
    assert!(err.backtrace.is_some());
}

#[test]
fn define_readonly_global_is_visible() {
    let mut rt = runtime();
    rt.define_readonly_global("$PROGRAM", Value::string("p"));
    assert_eq!(rt.global_get("$PROGRAM"), Value::string("p"));
    assert!(rt.global_set("$PROGRAM", Value::Nil).is_err());
}

#[test]
fn unknown_global_reads_nil_singleton() {
    let mut rt = runtime();
    assert!(rt.global_get("$nothing").same(&Value::Nil));
    assert!(rt.is_global_defined("$nothing"));
    assert!(rt.undefine_global("$nothing"));
    assert!(!rt.global_names().contains(&"$nothing".to_string()));
}

#[test]
fn alias_global_below_level_four() {
    let mut rt = runtime();
    rt.global_set("$old", Value::int(1)).unwrap();
    rt.alias_global("$old", "$new").unwrap();
    rt.global_set("$new", Value::int(2)).unwrap();
    assert_eq!(rt.global_get("$old"), Value::int(2));
}

#[test]
fn alias_global_refused_at_level_four() {
    let mut rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .safe_level(4)
        .build_initialized();
    let err = rt.alias_global("$old", "$new").unwrap_err();
    assert_eq!(err.message, "Insecure: can't alias global variable");
    assert_eq!(err.exception_class(), "SecurityError");
    assert!(!rt.is_global_defined("$new"));
}

// Safe level

#[test]
fn safe_global_reflects_and_raises_level() {
    let mut rt = runtime();
    assert_eq!(rt.global_get("$SAFE"), Value::int(0));
    rt.global_set("$SAFE", Value::int(2)).unwrap();
    assert_eq!(rt.safe_level(), 2);
    assert_eq!(rt.global_get("$SAFE"), Value::int(2));
}

#[test]
fn safe_level_cannot_be_lowered() {
    let mut rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .safe_level(3)
        .build_initialized();
    let err = rt.global_set("$SAFE", Value::int(1)).unwrap_err();
    assert_eq!(err.message, "tried to downgrade safe level from 3 to 1");
    assert!(rt.set_safe_level(2).is_err());
    assert_eq!(rt.safe_level(), 3);
}

#[test]
fn safe_level_must_be_an_integer() {
    let mut rt = runtime();
    let err = rt.global_set("$SAFE", Value::string("1")).unwrap_err();
    assert_eq!(err.message, "$SAFE must be an integer, not string");
    assert_eq!(err.exception_class(), "SecurityError");
    assert!(err.backtrace.is_some());
    assert_eq!(rt.safe_level(), 0);
}

#[test]
fn builder_clamps_safe_level() {
    let rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .safe_level(9)
        .build_initialized();
    assert_eq!(rt.safe_level(), MAX_SAFE_LEVEL);
}

#[test]
fn secure_passes_above_current_level() {
    let rt = runtime();
    assert!(rt.secure(1).is_ok());
    assert!(rt.secure(4).is_ok());
}

#[test]
fn secure_names_the_running_method() {
    let mut rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .safe_level(2)
        .build_initialized();
    assert!(rt.secure(3).is_ok());

    let receiver = rt.top_self().clone();
    let result = rt.invoke_frame(receiver, "eval", |rt| {
        rt.secure(2)?;
        Ok(Value::Nil)
    });
    let err = match result {
        Err(ControlAction::Error(err)) => err,
        other => panic!("expected a security error, got {other:?}"),
    };
    assert_eq!(err.message, "Insecure operation 'eval' at level 2");
    assert_eq!(err.exception_class(), "SecurityError");
    assert_eq!(err.backtrace.unwrap().frames()[0].name, "eval");
}

#[test]
fn secure_at_top_level_has_no_operation_name() {
    let rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .safe_level(1)
        .build_initialized();
    let err = rt.secure(1).unwrap_err();
    assert_eq!(err.message, "Insecure operation at level 1");
}

// Special slots

#[test]
fn last_line_and_back_ref_live_in_scope_slots() {
    let mut rt = runtime();
    assert_eq!(rt.last_line(), Value::Nil);
    rt.global_set("$_", Value::string("line")).unwrap();
    rt.set_back_ref(Value::int(3));
    assert_eq!(rt.last_line(), Value::string("line"));
    assert_eq!(rt.global_get("$~"), Value::int(3));

    let scope = rt.current_scope();
    assert_eq!(scope.borrow().get(LAST_LINE_SLOT), Value::string("line"));
    assert_eq!(scope.borrow().local_names()[BACK_REF_SLOT], "~");
}

#[test]
fn last_line_of_a_local_less_scope_is_nil() {
    let mut rt = runtime();
    rt.set_last_line(Value::string("outer"));
    rt.push_scope(Scope::new());
    assert_eq!(rt.last_line(), Value::Nil);
    rt.set_last_line(Value::string("inner"));
    assert_eq!(rt.last_line(), Value::string("inner"));
    rt.pop_scope();
    assert_eq!(rt.last_line(), Value::string("outer"));
}

// Compile and load

struct RecordingParser {
    seen: Vec<String>,
    introduce: Vec<&'static str>,
    fail: bool,
}

impl Parser for RecordingParser {
    type Ast = String;

    fn parse(
        &mut self,
        source: &str,
        _file: &str,
        _line: u32,
        known_locals: &[String],
    ) -> Result<ParseOutput<String>, EvalError> {
        if self.fail {
            return Err(EvalError::new("syntax error"));
        }
        self.seen = known_locals.to_vec();
        let local_names = if self.introduce.is_empty() {
            None
        } else {
            let mut names = known_locals.to_vec();
            names.extend(self.introduce.iter().map(ToString::to_string));
            Some(names)
        };
        Ok(ParseOutput {
            ast: source.to_uppercase(),
            local_names,
        })
    }
}

#[test]
fn compile_seeds_and_extends_locals() {
    let mut rt = runtime();
    let mut parser = RecordingParser {
        seen: Vec::new(),
        introduce: vec!["a"],
        fail: false,
    };
    let ast = rt.compile(&mut parser, "a = 1", "t.rb", 1).unwrap();
    assert_eq!(ast, "A = 1");
    assert_eq!(parser.seen, vec!["_".to_string(), "~".to_string()]);
    assert_eq!(rt.current_scope().borrow().local_names(), ["_", "~", "a"]);

    parser.introduce.clear();
    rt.compile(&mut parser, "a", "t.rb", 2).unwrap();
    assert_eq!(parser.seen.len(), 3);
}

#[test]
fn compiled_locals_of_a_fresh_scope_start_after_the_special_slots() {
    let mut rt = runtime();
    rt.push_scope(Scope::new());
    let mut parser = RecordingParser {
        seen: Vec::new(),
        introduce: vec!["a"],
        fail: false,
    };
    rt.compile(&mut parser, "a = 1", "t.rb", 1).unwrap();
    assert!(parser.seen.is_empty());
    assert_eq!(rt.current_scope().borrow().local_names(), ["_", "~", "a"]);

    assert!(rt.current_scope().borrow_mut().assign("a", Value::int(1)));
    rt.set_last_line(Value::string("line"));
    assert_eq!(rt.current_scope().borrow().lookup("a"), Some(Value::int(1)));
    rt.pop_scope();
}

#[test]
fn compile_errors_carry_a_backtrace() {
    let mut rt = runtime();
    let mut parser = RecordingParser {
        seen: Vec::new(),
        introduce: Vec::new(),
        fail: true,
    };
    let err = rt.compile(&mut parser, "(", "t.rb", 1).unwrap_err();
    assert_eq!(err.message, "syntax error");
    assert!(err.backtrace.is_some());
}

#[test]
fn find_file_searches_the_load_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("lib.rb"), "").unwrap();

    let mut rt = runtime();
    rt.init_load(&[dir.path().to_path_buf()]);
    assert_eq!(rt.load_path()[0], dir.path());
    assert_eq!(
        rt.find_file(Path::new("lib.rb")).unwrap(),
        dir.path().join("lib.rb")
    );
}

#[test]
fn find_file_accepts_existing_absolute_paths() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("main.rb");
    std::fs::write(&file, "").unwrap();
    let mut rt = runtime();
    assert_eq!(rt.find_file(&file).unwrap(), file);
}

#[test]
fn find_file_reports_missing_files() {
    let mut rt = runtime();
    let err = rt.find_file(Path::new("nope_missing.rb")).unwrap_err();
    assert_eq!(err.message, "No such file to load -- nope_missing.rb");
    assert_eq!(err.exception_class(), "LoadError");
}

#[test]
fn lib_dir_is_on_the_load_path() {
    let mut rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .home_dir("/opt/garnet")
        .build_initialized();
    assert!(rt
        .load_path()
        .contains(&PathBuf::from("/opt/garnet/lib/ruby")));
}

// Accessors

#[test]
fn source_position() {
    let mut rt = runtime();
    rt.set_source_file("main.rb");
    rt.set_source_line(12);
    assert_eq!(rt.source_file(), "main.rb");
    assert_eq!(rt.source_line(), 12);
    assert_eq!(rt.position(), "main.rb:12");
}

#[test]
fn eval_nesting() {
    let mut rt = runtime();
    assert!(!rt.in_eval());
    rt.enter_eval();
    rt.enter_eval();
    rt.leave_eval();
    assert!(rt.in_eval());
    rt.leave_eval();
    assert!(!rt.in_eval());
}

#[test]
fn wrapper_and_method_scope() {
    let mut rt = runtime();
    let wrapper = rt.define_module("Wrapper");
    assert_eq!(rt.set_wrapper(Some(wrapper.clone())), None);
    assert_eq!(rt.wrapper(), Some(&wrapper));
    rt.set_method_scope(Visibility::Public);
    assert!(rt.is_scope(Visibility::Public));
}

// Depth limit and reporting

#[test]
fn call_depth_limit_raises_system_stack_error() {
    let mut rt = RuntimeBuilder::new()
        .error_stream(silent_stream())
        .max_call_depth(Some(4))
        .build_initialized();

    fn recurse(rt: &mut Runtime) -> garnet_value::EvalResult {
        let receiver = rt.top_self().clone();
        rt.invoke_frame(receiver, "recurse", recurse)
    }

    let Err(ControlAction::Error(err)) = recurse(&mut rt) else {
        panic!("expected SystemStackError");
    };
    assert_eq!(err.kind, EvalErrorKind::StackDepthExceeded { depth: 4 });
    assert_eq!(err.exception_class(), "SystemStackError");
    assert_eq!(rt.frame_depth(), 1);
    assert_eq!(rt.iter_depth(), 1);
}

#[test]
fn report_formats_escaped_actions() {
    let stream = buffer_stream();
    let rt = RuntimeBuilder::new()
        .error_stream(stream.clone())
        .build_initialized();

    rt.report(&ControlAction::Break(Value::Nil));
    rt.report(&ControlAction::Return(Value::int(1)));
    rt.report(&ControlAction::Next);
    rt.report(&ControlAction::Throw {
        tag: Value::string("done"),
        value: Value::Nil,
    });
    assert_eq!(
        stream.output(),
        "break without block.\n\
         return without block.\n\
         LocalJumpError: unexpected next\n\
         ArgumentError: uncaught throw `done'\n"
    );
}

#[test]
fn report_includes_backtrace() {
    let stream = buffer_stream();
    let mut rt = RuntimeBuilder::new()
        .error_stream(stream.clone())
        .build_initialized();
    let receiver = rt.top_self().clone();
    let result = rt.invoke_frame(receiver, "each", |rt| {
        rt.yield_block(None, None, None, false)
    });
    rt.report(&result.unwrap_err());
    assert_eq!(
        stream.output(),
        "LocalJumpError: no block given\n\tfrom each\n\tfrom <main>\n"
    );
}
