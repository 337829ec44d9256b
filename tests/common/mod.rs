//! Mock native object model shared by the integration tests.
//!
//! `Sample.UI.Widget` implements:
//! - `IWidget`: `name` (read-write), `id` (read-only), `resize/1`, `resize/2`,
//!   `area`, `measure` (output parameters), delegate methods, `load`
//!   (asynchronous) and the `changed` event
//! - `IWidget3D`: `resize/3`, `describe` and the read-only `depth`
//! - `IHidden`: implemented but never registered
//!
//! The widget factory serves `IWidgetFactory` (`create/0`, `create/1`),
//! `IWidgetSizedFactory` (`createSized/2`) and `IWidgetStatics`.

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use projection::invoker::DispatchQueue;
use projection::prelude::*;

pub const IWIDGET: Guid = Guid::from_u128(0x7b1f_0001_0000_4000_8000_0000_0000_0001);
pub const IWIDGET_3D: Guid = Guid::from_u128(0x7b1f_0002_0000_4000_8000_0000_0000_0002);
pub const IHIDDEN: Guid = Guid::from_u128(0x7b1f_0003_0000_4000_8000_0000_0000_0003);
pub const IWIDGET_FACTORY: Guid = Guid::from_u128(0x7b1f_0004_0000_4000_8000_0000_0000_0004);
pub const IWIDGET_SIZED_FACTORY: Guid = Guid::from_u128(0x7b1f_0005_0000_4000_8000_0000_0000_0005);
pub const IWIDGET_STATICS: Guid = Guid::from_u128(0x7b1f_0006_0000_4000_8000_0000_0000_0006);

pub const WIDGET_CLASS: &str = "Sample.UI.Widget";
pub const THEME_CLASS: &str = "Sample.UI.Theme";
pub const SEALED_CLASS: &str = "Sample.Util.Sealed";

static NEXT_ID: AtomicI32 = AtomicI32::new(1);

// ============================================================================
// Widget
// ============================================================================

pub struct Widget {
    id: i32,
    name: Mutex<String>,
    size: Mutex<(f64, f64)>,
    interfaces: Vec<InterfaceId>,
    identity: Option<ObjectId>,
    handlers: Mutex<Vec<(i64, NativeDelegate)>>,
    next_token: AtomicI64,
    transform: Mutex<Option<NativeDelegate>>,
    loads: Mutex<Vec<Arc<MockOperation>>>,
}

impl Widget {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_interfaces(name, vec![IWIDGET, IWIDGET_3D, IHIDDEN])
    }

    pub fn with_interfaces(name: &str, interfaces: Vec<InterfaceId>) -> Arc<Self> {
        Self::build(name, interfaces, None)
    }

    /// A widget reporting a fixed identity, the way a recycled native
    /// address would.
    pub fn with_identity(name: &str, identity: ObjectId) -> Arc<Self> {
        Self::build(name, vec![IWIDGET, IWIDGET_3D, IHIDDEN], Some(identity))
    }

    fn build(name: &str, interfaces: Vec<InterfaceId>, identity: Option<ObjectId>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: Mutex::new(name.to_string()),
            size: Mutex::new((0.0, 0.0)),
            interfaces,
            identity,
            handlers: Mutex::new(Vec::new()),
            next_token: AtomicI64::new(1),
            transform: Mutex::new(None),
            loads: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn size(&self) -> (f64, f64) {
        *self.size.lock()
    }

    /// Number of native delegates subscribed to `changed`.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Raise `changed` on the calling thread.
    pub fn raise_changed(&self, detail: &str) {
        let handlers: Vec<NativeDelegate> =
            self.handlers.lock().iter().map(|(_, d)| d.clone()).collect();
        for handler in handlers {
            handler
                .invoke(&[NativeValue::String(detail.to_string())])
                .unwrap();
        }
    }

    /// Run the delegate stored by `setTransform`.
    pub fn run_transform(&self, value: f64) -> Result<NativeValue, NativeError> {
        let transform = self
            .transform
            .lock()
            .clone()
            .ok_or_else(|| NativeError::fail("no transform"))?;
        transform.invoke(&[NativeValue::F64(value)])
    }

    /// The operation started by the most recent `load` call.
    pub fn last_load(&self) -> Arc<MockOperation> {
        self.loads.lock().last().cloned().unwrap()
    }
}

impl NativeObject for Widget {
    fn interfaces(&self) -> Vec<InterfaceId> {
        self.interfaces.clone()
    }

    fn identity(&self) -> ObjectId {
        self.identity.unwrap_or(ObjectId(self as *const Self as usize))
    }

    fn runtime_class_name(&self) -> Option<&str> {
        Some(WIDGET_CLASS)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Factory
// ============================================================================

#[derive(Default)]
pub struct WidgetFactory {
    created: AtomicUsize,
    default_name: Mutex<String>,
}

impl WidgetFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created: AtomicUsize::new(0),
            default_name: Mutex::new("widget".to_string()),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn build(&self, name: String) -> NativeValue {
        self.created.fetch_add(1, Ordering::SeqCst);
        let widget: NativeRef = Widget::new(&name);
        NativeValue::Object(Some(widget))
    }
}

impl NativeObject for WidgetFactory {
    fn interfaces(&self) -> Vec<InterfaceId> {
        vec![IWIDGET_FACTORY, IWIDGET_SIZED_FACTORY, IWIDGET_STATICS]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Asynchronous operation
// ============================================================================

struct OperationState {
    status: AsyncStatus,
    result: Option<Result<NativeValue, NativeError>>,
    on_completed: Option<CompletionHandler>,
    on_progress: Option<ProgressHandler>,
}

/// A native operation completed by hand.
pub struct MockOperation {
    state: Mutex<OperationState>,
}

impl MockOperation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(OperationState {
                status: AsyncStatus::Started,
                result: None,
                on_completed: None,
                on_progress: None,
            }),
        })
    }

    pub fn succeed(&self, value: NativeValue) {
        self.finish(AsyncStatus::Completed, Ok(value));
    }

    pub fn fail(&self, error: NativeError) {
        self.finish(AsyncStatus::Error, Err(error));
    }

    pub fn report(&self, value: NativeValue) {
        let handler = self.state.lock().on_progress.clone();
        if let Some(handler) = handler {
            handler(value);
        }
    }

    pub fn has_completion_handler(&self) -> bool {
        self.state.lock().on_completed.is_some()
    }

    fn finish(&self, status: AsyncStatus, result: Result<NativeValue, NativeError>) {
        let handler = {
            let mut state = self.state.lock();
            if state.status.is_terminal() {
                return;
            }
            state.status = status;
            state.result = Some(result);
            state.on_completed.take()
        };
        if let Some(handler) = handler {
            handler(status);
        }
    }
}

impl AsyncOperation for MockOperation {
    fn status(&self) -> AsyncStatus {
        self.state.lock().status
    }

    fn on_completed(&self, handler: CompletionHandler) {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            let status = state.status;
            drop(state);
            handler(status);
        } else {
            state.on_completed = Some(handler);
        }
    }

    fn on_progress(&self, handler: ProgressHandler) -> bool {
        self.state.lock().on_progress = Some(handler);
        true
    }

    fn results(&self) -> Result<NativeValue, NativeError> {
        self.state
            .lock()
            .result
            .clone()
            .unwrap_or_else(|| Err(NativeError::new(codes::E_ILLEGAL_METHOD_CALL, "still running")))
    }

    fn cancel(&self) {
        self.finish(AsyncStatus::Canceled, Err(NativeError::canceled()));
    }
}

// ============================================================================
// Descriptors
// ============================================================================

fn transform_signature() -> Converter {
    Converter::delegate("Transform", vec![Converter::F64], Converter::F64)
}

fn changed_signature() -> DelegateSignature {
    DelegateSignature {
        name: "ChangedHandler".to_string(),
        params: vec![Converter::String],
        result: Converter::Void,
    }
}

fn widget_interface() -> InterfaceDescriptorBuilder {
    InterfaceDescriptor::builder(IWIDGET, "IWidget")
        .property(PropertyDescriptor::read_write(
            "name",
            Converter::String,
            NativeThunk::new(|frame| {
                let name = frame.this::<Widget>()?.name();
                frame.set_return(name);
                Ok(())
            }),
            NativeThunk::new(|frame| {
                let name: String = frame.arg(0)?;
                *frame.this::<Widget>()?.name.lock() = name;
                Ok(())
            }),
        ))
        .property(PropertyDescriptor::read_only(
            "id",
            Converter::I32,
            NativeThunk::new(|frame| {
                let id = frame.this::<Widget>()?.id;
                frame.set_return(id);
                Ok(())
            }),
        ))
        .method("resize", || {
            vec![
                Overload::new(
                    vec![ParamAdapter::input("size", Converter::F64)],
                    None,
                    NativeThunk::new(|frame| {
                        let size: f64 = frame.arg(0)?;
                        *frame.this::<Widget>()?.size.lock() = (size, size);
                        Ok(())
                    }),
                ),
                Overload::new(
                    vec![
                        ParamAdapter::input("width", Converter::F64),
                        ParamAdapter::input("height", Converter::F64),
                    ],
                    None,
                    NativeThunk::new(|frame| {
                        let width: f64 = frame.arg(0)?;
                        let height: f64 = frame.arg(1)?;
                        *frame.this::<Widget>()?.size.lock() = (width, height);
                        Ok(())
                    }),
                ),
            ]
        })
        .method("area", || {
            vec![Overload::new(
                vec![],
                Some(Converter::F64),
                NativeThunk::new(|frame| {
                    let (width, height) = frame.this::<Widget>()?.size();
                    frame.set_return(width * height);
                    Ok(())
                }),
            )]
        })
        .method("measure", || {
            vec![Overload::new(
                vec![
                    ParamAdapter::input("scale", Converter::F64),
                    ParamAdapter::output("width", Converter::F64),
                    ParamAdapter::output("height", Converter::F64),
                ],
                Some(Converter::BOOL),
                NativeThunk::new(|frame| {
                    let scale: f64 = frame.arg(0)?;
                    let (width, height) = frame.this::<Widget>()?.size();
                    frame.set_out(1, width * scale);
                    frame.set_out(2, height * scale);
                    frame.set_return(width > 0.0 && height > 0.0);
                    Ok(())
                }),
            )]
        })
        .method("apply", || {
            vec![Overload::new(
                vec![
                    ParamAdapter::input("transform", transform_signature()),
                    ParamAdapter::input("value", Converter::F64),
                ],
                Some(Converter::F64),
                NativeThunk::new(|frame| {
                    let NativeValue::Delegate(Some(transform)) = frame.arg_slot(0)?.clone() else {
                        return Err(NativeError::invalid_arg("transform"));
                    };
                    let value = frame.arg_slot(1)?.clone();
                    let result = transform.invoke(&[value])?;
                    frame.set_return_slot(result);
                    Ok(())
                }),
            )]
        })
        .method("setTransform", || {
            vec![Overload::new(
                vec![ParamAdapter::input("transform", transform_signature())],
                None,
                NativeThunk::new(|frame| {
                    let NativeValue::Delegate(transform) = frame.arg_slot(0)?.clone() else {
                        return Err(NativeError::invalid_arg("transform"));
                    };
                    *frame.this::<Widget>()?.transform.lock() = transform;
                    Ok(())
                }),
            )]
        })
        .method("doubler", || {
            vec![Overload::new(
                vec![],
                Some(transform_signature()),
                NativeThunk::new(|frame| {
                    let doubler = NativeDelegate::new(|args: &[NativeValue]| {
                        let value = args.first().and_then(NativeValue::as_f64).unwrap_or(0.0);
                        Ok(NativeValue::F64(value * 2.0))
                    });
                    frame.set_return_slot(NativeValue::Delegate(Some(doubler)));
                    Ok(())
                }),
            )]
        })
        .method("load", || {
            vec![Overload::new(
                vec![],
                Some(Converter::async_operation(Converter::String, Some(Converter::F64))),
                NativeThunk::new(|frame| {
                    let operation = MockOperation::new();
                    frame.this::<Widget>()?.loads.lock().push(Arc::clone(&operation));
                    let operation: AsyncRef = operation;
                    frame.set_return_slot(NativeValue::Async(operation));
                    Ok(())
                }),
            )]
        })
        .event(EventDescriptor::new(
            "changed",
            changed_signature(),
            NativeThunk::new(|frame| {
                let NativeValue::Delegate(Some(handler)) = frame.arg_slot(0)?.clone() else {
                    return Err(NativeError::invalid_arg("handler"));
                };
                let widget = frame.this::<Widget>()?;
                let token = widget.next_token.fetch_add(1, Ordering::SeqCst);
                widget.handlers.lock().push((token, handler));
                frame.set_return(token);
                Ok(())
            }),
            NativeThunk::new(|frame| {
                let token: i64 = frame.arg(0)?;
                frame.this::<Widget>()?.handlers.lock().retain(|(t, _)| *t != token);
                Ok(())
            }),
        ))
}

fn widget_3d_interface() -> InterfaceDescriptorBuilder {
    InterfaceDescriptor::builder(IWIDGET_3D, "IWidget3D")
        .property(PropertyDescriptor::read_only(
            "depth",
            Converter::F64,
            NativeThunk::new(|frame| {
                frame.set_return(1.0_f64);
                Ok(())
            }),
        ))
        .method("resize", || {
            vec![Overload::new(
                vec![
                    ParamAdapter::input("width", Converter::F64),
                    ParamAdapter::input("height", Converter::F64),
                    ParamAdapter::input("depth", Converter::F64),
                ],
                Some(Converter::String),
                NativeThunk::new(|frame| {
                    let width: f64 = frame.arg(0)?;
                    let height: f64 = frame.arg(1)?;
                    *frame.this::<Widget>()?.size.lock() = (width, height);
                    frame.set_return("3d");
                    Ok(())
                }),
            )]
        })
        .method("describe", || {
            vec![Overload::new(
                vec![],
                Some(Converter::String),
                NativeThunk::new(|frame| {
                    let name = frame.this::<Widget>()?.name();
                    frame.set_return(format!("widget:{name}"));
                    Ok(())
                }),
            )]
        })
}

fn factory_interface() -> InterfaceDescriptorBuilder {
    InterfaceDescriptor::builder(IWIDGET_FACTORY, "IWidgetFactory").method("create", || {
        vec![
            Overload::new(
                vec![],
                Some(Converter::Object(Some(IWIDGET))),
                NativeThunk::new(|frame| {
                    let factory = frame.this::<WidgetFactory>()?;
                    let name = factory.default_name.lock().clone();
                    let widget = factory.build(name);
                    frame.set_return_slot(widget);
                    Ok(())
                }),
            ),
            Overload::new(
                vec![ParamAdapter::input("name", Converter::String)],
                Some(Converter::Object(Some(IWIDGET))),
                NativeThunk::new(|frame| {
                    let name: String = frame.arg(0)?;
                    let widget = frame.this::<WidgetFactory>()?.build(name);
                    frame.set_return_slot(widget);
                    Ok(())
                }),
            ),
        ]
    })
}

fn sized_factory_interface() -> InterfaceDescriptorBuilder {
    InterfaceDescriptor::builder(IWIDGET_SIZED_FACTORY, "IWidgetSizedFactory").method(
        "createSized",
        || {
            vec![Overload::new(
                vec![
                    ParamAdapter::input("name", Converter::String),
                    ParamAdapter::input("size", Converter::F64),
                ],
                Some(Converter::Object(Some(IWIDGET))),
                NativeThunk::new(|frame| {
                    let name: String = frame.arg(0)?;
                    let size: f64 = frame.arg(1)?;
                    let widget = frame.this::<WidgetFactory>()?.build(name);
                    if let NativeValue::Object(Some(object)) = &widget
                        && let Some(w) = object.as_any().downcast_ref::<Widget>()
                    {
                        *w.size.lock() = (size, size);
                    }
                    frame.set_return_slot(widget);
                    Ok(())
                }),
            )]
        },
    )
}

fn statics_interface() -> InterfaceDescriptorBuilder {
    InterfaceDescriptor::builder(IWIDGET_STATICS, "IWidgetStatics")
        .property(PropertyDescriptor::read_only(
            "count",
            Converter::U32,
            NativeThunk::new(|frame| {
                let created = frame.this::<WidgetFactory>()?.created() as u32;
                frame.set_return(created);
                Ok(())
            }),
        ))
        .property(PropertyDescriptor::read_write(
            "defaultName",
            Converter::String,
            NativeThunk::new(|frame| {
                let name = frame.this::<WidgetFactory>()?.default_name.lock().clone();
                frame.set_return(name);
                Ok(())
            }),
            NativeThunk::new(|frame| {
                let name: String = frame.arg(0)?;
                *frame.this::<WidgetFactory>()?.default_name.lock() = name;
                Ok(())
            }),
        ))
        .method("reset", || {
            vec![Overload::new(
                vec![],
                None,
                NativeThunk::new(|frame| {
                    frame.this::<WidgetFactory>()?.created.store(0, Ordering::SeqCst);
                    Ok(())
                }),
            )]
        })
}

/// The widgets module bound to `factory`.
pub fn widgets_module(factory: &Arc<WidgetFactory>) -> ProjectionModule {
    let activation = {
        let factory = Arc::clone(factory);
        move || -> Result<NativeRef, NativeError> {
            let object: NativeRef = factory.clone();
            Ok(object)
        }
    };
    let theme_activation = activation.clone();
    ProjectionModule::new("Sample.UI")
        .interfaces([
            InterfaceRegistration::new(IWIDGET, "IWidget", widget_interface),
            InterfaceRegistration::new(IWIDGET_3D, "IWidget3D", widget_3d_interface),
            InterfaceRegistration::new(IWIDGET_FACTORY, "IWidgetFactory", factory_interface),
            InterfaceRegistration::new(
                IWIDGET_SIZED_FACTORY,
                "IWidgetSizedFactory",
                sized_factory_interface,
            ),
            InterfaceRegistration::new(IWIDGET_STATICS, "IWidgetStatics", statics_interface),
        ])
        .class(
            RuntimeClassDescriptor::new(WIDGET_CLASS, activation)
                .constructor(IWIDGET_FACTORY, "create")
                .constructor(IWIDGET_SIZED_FACTORY, "createSized")
                .statics(IWIDGET_STATICS),
        )
        .class(RuntimeClassDescriptor::new(THEME_CLASS, theme_activation).statics(IWIDGET_STATICS))
        .class(RuntimeClassDescriptor::new(SEALED_CLASS, || {
            Err(NativeError::fail("no activation factory"))
        }))
}

// ============================================================================
// Harness
// ============================================================================

/// Route bridge logs to the test output. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A context with the widgets module installed, owned by the calling thread.
pub struct Harness {
    pub ctx: Arc<Context>,
    pub queue: DispatchQueue,
    pub factory: Arc<WidgetFactory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProjectionConfig::default())
    }

    pub fn with_config(config: ProjectionConfig) -> Self {
        init_tracing();
        let factory = WidgetFactory::new();
        let (invoker, queue) = ThreadInvoker::for_current_thread();
        let ctx = Context::builder()
            .install(widgets_module(&factory))
            .with_invoker(invoker)
            .with_config(config)
            .build()
            .expect("widgets module installs cleanly");
        Self {
            ctx,
            queue,
            factory,
        }
    }

    /// Project a fresh widget.
    pub fn widget(&self, name: &str) -> (Arc<Widget>, ScriptValue) {
        let widget = Widget::new(name);
        let value = self.ctx.project(widget.clone());
        (widget, value)
    }
}

/// Call method `name` on `target`.
pub fn call(target: &ScriptValue, name: &str, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    match target.get(name)? {
        ScriptValue::Function(function) => function.call(args),
        other => panic!("{name} is not callable: {other:?}"),
    }
}

/// Record every call's arguments.
pub fn recorder() -> (ScriptFunction, Arc<Mutex<Vec<Vec<ScriptValue>>>>) {
    let calls: Arc<Mutex<Vec<Vec<ScriptValue>>>> = Arc::default();
    let seen = Arc::clone(&calls);
    let function = ScriptFunction::new("recorder", move |args| {
        seen.lock().push(args.to_vec());
        Ok(ScriptValue::Undefined)
    });
    (function, calls)
}
