//! Built-in translations of scalar members and methods.

use query_engine_metadata::metadata::ClrType;
use query_engine_sql::sql;
use sql::ast::{BinaryOperator, Expression, Function, Value};

use super::{MemberTranslator, MethodCallTranslator, ProviderContext};
use crate::translation::expression::{DeclaringType, MethodInfo};
use crate::translation::factory::SqlExpressionFactory;

/// `string.Length` and `Nullable<T>.HasValue`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMemberTranslator;

impl MemberTranslator for DefaultMemberTranslator {
    fn translate(
        &self,
        context: &mut ProviderContext<'_, '_>,
        instance: Option<&Expression>,
        member: &str,
        return_type: &ClrType,
    ) -> Option<Expression> {
        let factory = context.factory;
        let instance = instance?;
        match (instance.r#type.unwrap_nullable(), member) {
            (ClrType::String, "Length") => Some(factory.function(
                Function::Len,
                vec![factory.apply_default_type_mapping(instance.clone())],
                return_type.clone(),
                factory.find_mapping(return_type),
            )),
            (_, "HasValue") if matches!(instance.r#type, ClrType::Nullable(_)) => {
                Some(factory.is_not_null(instance.clone()))
            }
            _ => None,
        }
    }
}

/// String, math and equality methods, and `Contains` over constant arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMethodCallTranslator;

impl MethodCallTranslator for DefaultMethodCallTranslator {
    fn translate(
        &self,
        context: &mut ProviderContext<'_, '_>,
        instance: Option<&Expression>,
        method: &MethodInfo,
        arguments: &[Expression],
    ) -> Option<Expression> {
        let factory = context.factory;
        match (&method.declaring_type, instance, arguments) {
            (DeclaringType::String, Some(instance), _) => {
                translate_string_method(context, instance, method, arguments)
            }
            (DeclaringType::String, None, [left, right]) if method.name == "Equals" => {
                Some(equality(context, left, right))
            }
            (DeclaringType::String, None, [value]) if method.name == "IsNullOrEmpty" => {
                let empty = factory.constant(Value::String(String::new()), ClrType::String);
                Some(factory.or_else(
                    factory.is_null(value.clone()),
                    factory.equal(value.clone(), empty),
                ))
            }
            (_, Some(instance), [argument]) if method.name == "Equals" => {
                Some(equality(context, instance, argument))
            }
            (_, None, [left, right]) if method.name == "Equals" => {
                Some(equality(context, left, right))
            }
            (DeclaringType::Math, None, _) => translate_math_method(factory, method, arguments),
            (DeclaringType::Enumerable, None, [source, item]) if method.name == "Contains" => {
                translate_contains(factory, source, item)
            }
            (_, Some(source), [item])
                if method.name == "Contains" && matches!(source.r#type, ClrType::Sequence(_)) =>
            {
                translate_contains(factory, source, item)
            }
            _ => None,
        }
    }
}

/// `left = right`. Unless the database nulls are asked for, two NULLs are
/// equal too.
fn equality(context: &ProviderContext<'_, '_>, left: &Expression, right: &Expression) -> Expression {
    let factory = context.factory;
    let equal = factory.equal(left.clone(), right.clone());
    if context.options.use_relational_nulls
        || !left.is_nullable()
        || !right.is_nullable()
        || left.is_null_constant()
        || right.is_null_constant()
    {
        return equal;
    }
    factory.or_else(
        equal,
        factory.and_also(factory.is_null(left.clone()), factory.is_null(right.clone())),
    )
}

fn translate_string_method(
    context: &mut ProviderContext<'_, '_>,
    instance: &Expression,
    method: &MethodInfo,
    arguments: &[Expression],
) -> Option<Expression> {
    let factory = context.factory;
    let string_function = |function| {
        let instance = factory.apply_default_type_mapping(instance.clone());
        let mapping = instance.type_mapping.clone();
        factory.function(function, vec![instance], ClrType::String, mapping)
    };
    match (method.name.as_str(), arguments) {
        ("ToUpper", []) => Some(string_function(Function::Upper)),
        ("ToLower", []) => Some(string_function(Function::Lower)),
        ("Trim", []) => Some(string_function(Function::Trim)),
        ("Equals", [other]) => Some(equality(context, instance, other)),
        ("StartsWith", [prefix]) => like(context, instance, method, prefix, "", "%"),
        ("EndsWith", [suffix]) => like(context, instance, method, suffix, "%", ""),
        ("Contains", [infix]) => like(context, instance, method, infix, "%", "%"),
        _ => None,
    }
}

/// `instance LIKE pattern`, for constant patterns without wildcards of their own.
fn like(
    context: &mut ProviderContext<'_, '_>,
    instance: &Expression,
    method: &MethodInfo,
    pattern: &Expression,
    before: &str,
    after: &str,
) -> Option<Expression> {
    match pattern.constant_value() {
        Some(Value::String(text)) if text.contains(|c: char| matches!(c, '%' | '_' | '[')) => {
            context.errors.add(format!(
                "'string.{}' with the pattern '{text}' could not be translated because it contains LIKE wildcards.",
                method.name
            ));
            None
        }
        Some(Value::String(text)) => {
            let factory = context.factory;
            let pattern = factory.constant(
                Value::String(format!("{before}{text}{after}")),
                ClrType::String,
            );
            Some(factory.make_binary(BinaryOperator::Like, instance.clone(), pattern))
        }
        _ => None,
    }
}

fn translate_math_method(
    factory: &SqlExpressionFactory,
    method: &MethodInfo,
    arguments: &[Expression],
) -> Option<Expression> {
    let (function, args) = match (method.name.as_str(), arguments) {
        ("Abs", [value]) => (Function::Abs, vec![value.clone()]),
        ("Floor", [value]) => (Function::Floor, vec![value.clone()]),
        ("Ceiling", [value]) => (Function::Ceiling, vec![value.clone()]),
        ("Round", [value]) => (
            Function::Round,
            vec![
                value.clone(),
                factory.constant(Value::Int(0), ClrType::Int32),
            ],
        ),
        ("Round", [value, digits]) => (Function::Round, vec![value.clone(), digits.clone()]),
        _ => return None,
    };
    let mut args = args.into_iter();
    let value = factory.apply_default_type_mapping(args.next()?);
    let mapping = value.type_mapping.clone();
    let mut all_args = vec![value];
    all_args.extend(args.map(|arg| factory.apply_default_type_mapping(arg)));
    Some(factory.function(
        function,
        all_args,
        method.return_type.clone(),
        mapping,
    ))
}

/// `item IN (values)` for a constant array. NULL elements become a null test.
fn translate_contains(
    factory: &SqlExpressionFactory,
    source: &Expression,
    item: &Expression,
) -> Option<Expression> {
    let (Some(Value::Array(values)), ClrType::Sequence(element_type)) =
        (source.constant_value(), &source.r#type)
    else {
        return None;
    };

    let (nulls, values): (Vec<&Value>, Vec<&Value>) =
        values.iter().partition(|value| **value == Value::Null);

    let membership = if values.is_empty() {
        None
    } else {
        Some(
            factory.in_values(
                item.clone(),
                values
                    .into_iter()
                    .map(|value| factory.constant(value.clone(), (**element_type).clone()))
                    .collect(),
            ),
        )
    };
    let null_test = if nulls.is_empty() {
        None
    } else {
        Some(factory.is_null(item.clone()))
    };

    Some(
        match (membership, null_test) {
            (Some(membership), Some(null_test)) => factory.or_else(membership, null_test),
            (Some(test), None) | (None, Some(test)) => test,
            (None, None) => sql::helpers::false_expr(),
        },
    )
}

#[cfg(test)]
mod tests {
    use query_engine_configuration::TranslatorOptions;
    use query_engine_metadata::metadata::{DefaultTypeMappingSource, Metadata, TypeMappingSource};

    use super::*;
    use crate::translation::query::error::TranslationErrors;

    fn name_column() -> Expression {
        sql::helpers::make_column(
            sql::helpers::make_table_alias(0, "c".to_string()),
            "Name",
            ClrType::String,
            DefaultTypeMappingSource.find_mapping(&ClrType::String),
            true,
        )
    }

    fn nickname_column() -> Expression {
        sql::helpers::make_column(
            sql::helpers::make_table_alias(0, "c".to_string()),
            "Nickname",
            ClrType::nullable(ClrType::String),
            DefaultTypeMappingSource.find_mapping(&ClrType::String),
            true,
        )
    }

    fn string_constant(text: &str) -> Expression {
        Expression {
            kind: sql::ast::ExpressionKind::Value(Value::String(text.to_string())),
            r#type: ClrType::String,
            type_mapping: None,
        }
    }

    /// Run a method translation with the given options, returning the SQL
    /// and the recorded explanations.
    fn translate_method(
        options: TranslatorOptions,
        instance: Option<&Expression>,
        method: &MethodInfo,
        arguments: &[Expression],
    ) -> (Option<String>, Option<String>) {
        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, true);
        let metadata = Metadata::empty();
        let mut errors = TranslationErrors::default();
        let mut context = ProviderContext {
            factory: &factory,
            metadata: &metadata,
            options,
            errors: &mut errors,
        };
        let translated = DefaultMethodCallTranslator
            .translate(&mut context, instance, method, arguments)
            .map(|e| e.to_string());
        (translated, errors.details())
    }

    #[test]
    fn starts_with_a_constant_is_a_like() {
        let method = MethodInfo::new_instance(DeclaringType::String, "StartsWith", ClrType::Boolean);
        let (translated, _) = translate_method(
            TranslatorOptions::default(),
            Some(&name_column()),
            &method,
            &[string_constant("Al")],
        );
        assert_eq!(translated.as_deref(), Some("([c].[Name] LIKE N'Al%')"));

        let (translated, errors) = translate_method(
            TranslatorOptions::default(),
            Some(&name_column()),
            &method,
            &[string_constant("100%")],
        );
        assert_eq!(translated, None);
        assert!(errors.unwrap().contains("LIKE wildcards"));
    }

    #[test]
    fn contains_over_an_array_with_null_also_tests_for_null() {
        let names = Expression {
            kind: sql::ast::ExpressionKind::Value(Value::Array(vec![
                Value::String("Ann".to_string()),
                Value::Null,
            ])),
            r#type: ClrType::sequence(ClrType::String),
            type_mapping: None,
        };
        let method = MethodInfo::new_static(DeclaringType::Enumerable, "Contains", ClrType::Boolean);
        let (translated, _) = translate_method(
            TranslatorOptions::default(),
            None,
            &method,
            &[names, name_column()],
        );
        assert_eq!(
            translated.as_deref(),
            Some("([c].[Name] IN (N'Ann') OR [c].[Name] IS NULL)")
        );
    }

    #[test]
    fn equals_of_nullable_values_follows_the_null_semantics_option() {
        let method = MethodInfo::new_static(DeclaringType::String, "Equals", ClrType::Boolean);
        let arguments = [name_column(), nickname_column()];

        let (translated, _) =
            translate_method(TranslatorOptions::default(), None, &method, &arguments);
        assert_eq!(
            translated.as_deref(),
            Some("(([c].[Name] = [c].[Nickname]) OR ([c].[Name] IS NULL AND [c].[Nickname] IS NULL))")
        );

        let relational = TranslatorOptions {
            use_relational_nulls: true,
            ..TranslatorOptions::default()
        };
        let (translated, _) = translate_method(relational, None, &method, &arguments);
        assert_eq!(translated.as_deref(), Some("([c].[Name] = [c].[Nickname])"));
    }

    #[test]
    fn string_length_is_len() {
        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, true);
        let metadata = Metadata::empty();
        let mut errors = TranslationErrors::default();
        let mut context = ProviderContext {
            factory: &factory,
            metadata: &metadata,
            options: TranslatorOptions::default(),
            errors: &mut errors,
        };
        let translated = DefaultMemberTranslator.translate(
            &mut context,
            Some(&name_column()),
            "Length",
            &ClrType::Int32,
        );
        assert_eq!(
            translated.map(|e| e.to_string()).as_deref(),
            Some("LEN([c].[Name])")
        );
    }
}
