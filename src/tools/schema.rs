//! JSON Schema 生成（schemars）
//!
//! 工具参数与结构化输出共用：子 Schema 全部内联，避免部分 OpenAI 兼容后端不支持 $ref。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;

/// 生成类型 T 的内联 JSON Schema（去掉 $schema 与空 definitions）
pub fn inline_schema_for<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.option_add_null_type = false;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| empty_object_schema());
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        if obj
            .get("definitions")
            .and_then(Value::as_object)
            .is_some_and(|d| d.is_empty())
        {
            obj.remove("definitions");
        }
    }
    value
}

/// 无参数工具的 Schema
pub fn empty_object_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}
