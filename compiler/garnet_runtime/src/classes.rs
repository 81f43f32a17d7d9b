//! Class registry and the core class set created by `Runtime::init`.

use garnet_value::{ModuleRef, RModule, Value};
use rustc_hash::FxHashMap;

/// Name-keyed table of every class and module the runtime has defined.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ModuleRef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRef> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, module: ModuleRef) {
        self.classes.insert(name.to_string(), module);
    }

    /// Create and register a class under `superclass`.
    pub fn define_class(&mut self, name: &str, superclass: Option<&ModuleRef>) -> ModuleRef {
        let class = RModule::new_class(name, superclass.cloned());
        self.insert(name, class.clone());
        class
    }

    pub fn define_module(&mut self, name: &str) -> ModuleRef {
        let module = RModule::new_module(name);
        self.insert(name, module.clone());
        module
    }

    /// Sorted names of every registered class and module.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Handles to the classes every runtime starts with.
#[derive(Clone, Debug)]
pub struct CoreClasses {
    pub object: ModuleRef,
    pub module: ModuleRef,
    pub class: ModuleRef,
    pub kernel: ModuleRef,
    pub comparable: ModuleRef,
    pub enumerable: ModuleRef,
    pub nil_class: ModuleRef,
    pub true_class: ModuleRef,
    pub false_class: ModuleRef,
    pub numeric: ModuleRef,
    pub integer: ModuleRef,
    pub float: ModuleRef,
    pub string: ModuleRef,
    pub symbol: ModuleRef,
    pub array: ModuleRef,
    pub hash: ModuleRef,
    pub proc_class: ModuleRef,
}

impl CoreClasses {
    /// Create the core hierarchy in `registry` and bind each class as a
    /// constant on `Object`.
    pub fn define(registry: &mut ClassRegistry) -> Self {
        let object = registry.define_class("Object", None);
        let module = registry.define_class("Module", Some(&object));
        let class = registry.define_class("Class", Some(&module));
        let numeric = registry.define_class("Numeric", Some(&object));

        let core = CoreClasses {
            kernel: registry.define_module("Kernel"),
            comparable: registry.define_module("Comparable"),
            enumerable: registry.define_module("Enumerable"),
            nil_class: registry.define_class("NilClass", Some(&object)),
            true_class: registry.define_class("TrueClass", Some(&object)),
            false_class: registry.define_class("FalseClass", Some(&object)),
            integer: registry.define_class("Integer", Some(&numeric)),
            float: registry.define_class("Float", Some(&numeric)),
            string: registry.define_class("String", Some(&object)),
            symbol: registry.define_class("Symbol", Some(&object)),
            array: registry.define_class("Array", Some(&object)),
            hash: registry.define_class("Hash", Some(&object)),
            proc_class: registry.define_class("Proc", Some(&object)),
            object,
            module,
            class,
            numeric,
        };
        bind_constants(&core.object, registry);
        core
    }
}

/// The exception hierarchy.
#[derive(Clone, Debug)]
pub struct ExceptionClasses {
    pub exception: ModuleRef,
    pub script_error: ModuleRef,
    pub load_error: ModuleRef,
    pub standard_error: ModuleRef,
    pub runtime_error: ModuleRef,
    pub argument_error: ModuleRef,
    pub name_error: ModuleRef,
    pub type_error: ModuleRef,
    pub index_error: ModuleRef,
    pub local_jump_error: ModuleRef,
    pub security_error: ModuleRef,
    pub system_stack_error: ModuleRef,
    pub system_exit: ModuleRef,
    pub interrupt: ModuleRef,
}

impl ExceptionClasses {
    pub fn define(registry: &mut ClassRegistry, object: &ModuleRef) -> Self {
        let exception = registry.define_class("Exception", Some(object));
        let script_error = registry.define_class("ScriptError", Some(&exception));
        let standard_error = registry.define_class("StandardError", Some(&exception));

        let classes = ExceptionClasses {
            load_error: registry.define_class("LoadError", Some(&script_error)),
            runtime_error: registry.define_class("RuntimeError", Some(&standard_error)),
            argument_error: registry.define_class("ArgumentError", Some(&standard_error)),
            name_error: registry.define_class("NameError", Some(&standard_error)),
            type_error: registry.define_class("TypeError", Some(&standard_error)),
            index_error: registry.define_class("IndexError", Some(&standard_error)),
            local_jump_error: registry.define_class("LocalJumpError", Some(&standard_error)),
            security_error: registry.define_class("SecurityError", Some(&standard_error)),
            system_stack_error: registry.define_class("SystemStackError", Some(&standard_error)),
            system_exit: registry.define_class("SystemExit", Some(&exception)),
            interrupt: registry.define_class("Interrupt", Some(&exception)),
            exception,
            script_error,
            standard_error,
        };
        bind_constants(object, registry);
        classes
    }
}

fn bind_constants(object: &ModuleRef, registry: &ClassRegistry) {
    for (name, module) in &registry.classes {
        if object.constant(name).is_none() {
            object.define_constant(name, Value::module(module));
        }
    }
}
