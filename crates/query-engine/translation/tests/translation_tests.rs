pub mod common;

mod members {
    use query_engine_metadata::metadata::ClrType;
    use query_engine_translation::translation::expression::{
        DeclaringType, MethodInfo, QueryExpression,
    };
    use query_engine_translation::translation::query::error::Error;

    use super::common::{configuration, row, translate};

    #[tokio::test]
    async fn nested_complex_property_reads_its_prefixed_column() {
        let configuration = configuration("customers").await.unwrap();
        let zip_code = QueryExpression::member(
            QueryExpression::member(
                row(&configuration, "Customer"),
                "ShippingAddress",
                ClrType::structural("Address"),
            ),
            "ZipCode",
            ClrType::Int32,
        );

        let translated = translate(&configuration, &zip_code).unwrap();
        insta::assert_snapshot!(translated.sql.unwrap(), @"[c].[ShippingAddress_ZipCode]");
    }

    #[tokio::test]
    async fn scalar_members_of_complex_values_compare_as_columns() {
        let configuration = configuration("customers").await.unwrap();
        let comparison = QueryExpression::equal(
            QueryExpression::member(
                QueryExpression::member(
                    row(&configuration, "Customer"),
                    "ShippingAddress",
                    ClrType::structural("Address"),
                ),
                "ZipCode",
                ClrType::Int32,
            ),
            QueryExpression::constant(7728.into(), ClrType::Int32),
        );

        let translated = translate(&configuration, &comparison).unwrap();
        assert_eq!(
            translated.sql.as_deref(),
            Some("([c].[ShippingAddress_ZipCode] = 7728)")
        );
    }

    #[tokio::test]
    async fn indexer_properties_bind_through_the_indexer() {
        let configuration = configuration("customers").await.unwrap();
        let rating = QueryExpression::call(
            Some(row(&configuration, "Customer")),
            MethodInfo::new_instance(DeclaringType::Other("Customer".into()), "get_Item", ClrType::Object),
            vec![QueryExpression::constant("Rating".into(), ClrType::String)],
        );

        let translated = translate(&configuration, &rating).unwrap();
        assert_eq!(translated.sql.as_deref(), Some("[c].[Rating]"));
    }

    #[tokio::test]
    async fn unresolved_property_access_fails_the_translation() {
        let configuration = configuration("customers").await.unwrap();
        let missing = QueryExpression::call(
            None,
            MethodInfo::new_static(DeclaringType::EF, "Property", ClrType::Int32),
            vec![
                row(&configuration, "Customer"),
                QueryExpression::constant("Missing".into(), ClrType::String),
            ],
        );

        let result = translate(&configuration, &missing);
        assert!(
            matches!(result, Err(Error::UnresolvedPropertyAccess(_))),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn optional_dependent_properties_are_guarded_by_required_columns() {
        let configuration = configuration("order_details").await.unwrap();
        let detail = row(&configuration, "OrderDetail");

        let status = QueryExpression::member(detail.clone(), "Status", ClrType::String);
        let translated = translate(&configuration, &status).unwrap();
        insta::assert_snapshot!(
            translated.sql.unwrap(),
            @"CASE WHEN [o].[Quantity] IS NOT NULL THEN [o].[Status] END"
        );

        // columns owned by the dependent are read as they are
        let notes = QueryExpression::member(detail, "Notes", ClrType::String);
        let translated = translate(&configuration, &notes).unwrap();
        assert_eq!(translated.sql.as_deref(), Some("[o].[Notes]"));
    }
}

mod structural_equality {
    use query_engine_metadata::metadata::ClrType;
    use query_engine_translation::translation::expression::{
        DeclaringType, MethodInfo, QueryExpression,
    };
    use similar_asserts::assert_eq;

    use super::common::{configuration, row, translate, translate_twice};

    fn billing_address(customer: QueryExpression) -> QueryExpression {
        QueryExpression::member(customer, "BillingAddress", ClrType::structural("Address"))
    }

    #[tokio::test]
    async fn entities_compare_by_key() {
        let configuration = configuration("customers").await.unwrap();
        let comparison = QueryExpression::equal(
            row(&configuration, "Customer"),
            QueryExpression::parameter("customer", ClrType::structural("Customer")),
        );

        let translated = translate(&configuration, &comparison).unwrap();
        assert_eq!(
            translated.sql.as_deref(),
            Some("([c].[Id] = @entity_equality_customer_Id)")
        );
        assert_eq!(
            translated.runtime_parameters,
            vec!["entity_equality_customer_Id".to_string()]
        );
    }

    #[tokio::test]
    async fn nullable_complex_values_compare_null_as_equal() {
        let configuration = configuration("customers").await.unwrap();
        let comparison = QueryExpression::equal(
            billing_address(row(&configuration, "Customer")),
            QueryExpression::parameter("address", ClrType::structural("Address")),
        );

        let translated = translate(&configuration, &comparison).unwrap();
        assert_eq!(
            translated.sql.as_deref(),
            Some(concat!(
                "((([c].[BillingAddress_Street] = @entity_equality_address_Street)",
                " OR ([c].[BillingAddress_Street] IS NULL AND @entity_equality_address_Street IS NULL))",
                " AND (([c].[BillingAddress_ZipCode] = @entity_equality_address_ZipCode)",
                " OR ([c].[BillingAddress_ZipCode] IS NULL AND @entity_equality_address_ZipCode IS NULL)))"
            ))
        );
        assert_eq!(
            translated.runtime_parameters,
            vec![
                "entity_equality_address_Street".to_string(),
                "entity_equality_address_ZipCode".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn nullable_complex_values_differ_when_exactly_one_side_is_null() {
        let configuration = configuration("customers").await.unwrap();
        let comparison = QueryExpression::not_equal(
            billing_address(row(&configuration, "Customer")),
            QueryExpression::parameter("address", ClrType::structural("Address")),
        );

        let translated = translate(&configuration, &comparison).unwrap();
        assert_eq!(
            translated.sql.as_deref(),
            Some(concat!(
                "(((([c].[BillingAddress_Street] <> @entity_equality_address_Street)",
                " OR ([c].[BillingAddress_Street] IS NULL AND @entity_equality_address_Street IS NOT NULL))",
                " OR ([c].[BillingAddress_Street] IS NOT NULL AND @entity_equality_address_Street IS NULL))",
                " OR ((([c].[BillingAddress_ZipCode] <> @entity_equality_address_ZipCode)",
                " OR ([c].[BillingAddress_ZipCode] IS NULL AND @entity_equality_address_ZipCode IS NOT NULL))",
                " OR ([c].[BillingAddress_ZipCode] IS NOT NULL AND @entity_equality_address_ZipCode IS NULL)))"
            ))
        );
    }

    #[tokio::test]
    async fn constructed_complex_values_bind_arguments_in_declaration_order() {
        let configuration = configuration("customers").await.unwrap();
        let address = QueryExpression::New {
            r#type: ClrType::structural("Address"),
            arguments: vec![
                QueryExpression::constant("Main".into(), ClrType::String),
                QueryExpression::constant(5.into(), ClrType::Int32),
            ],
        };
        let comparison =
            QueryExpression::equal(billing_address(row(&configuration, "Customer")), address);

        let translated = translate(&configuration, &comparison).unwrap();
        assert_eq!(
            translated.sql.as_deref(),
            Some("(([c].[BillingAddress_Street] = N'Main') AND ([c].[BillingAddress_ZipCode] = 5))")
        );
    }

    #[tokio::test]
    async fn constructions_with_the_wrong_arity_are_not_translated() {
        let configuration = configuration("customers").await.unwrap();
        let address = QueryExpression::New {
            r#type: ClrType::structural("Address"),
            arguments: vec![QueryExpression::constant("Main".into(), ClrType::String)],
        };
        let comparison =
            QueryExpression::equal(billing_address(row(&configuration, "Customer")), address);

        let translated = translate(&configuration, &comparison).unwrap();
        assert_eq!(translated.sql, None);
        assert!(translated
            .error_details
            .unwrap()
            .contains("is not a constant of 'Address'"));
    }

    #[tokio::test]
    async fn members_missing_from_a_constant_are_not_compared_as_null() {
        let configuration = configuration("customers").await.unwrap();
        let address = QueryExpression::MemberInit {
            r#type: ClrType::structural("Address"),
            bindings: vec![(
                "Street".to_string(),
                QueryExpression::constant("Main".into(), ClrType::String),
            )],
        };
        let comparison =
            QueryExpression::equal(billing_address(row(&configuration, "Customer")), address);

        let translated = translate(&configuration, &comparison).unwrap();
        assert_eq!(translated.sql, None);
        assert_eq!(
            translated.error_details.as_deref(),
            Some("Values of 'Address' cannot be compared because a constant has no value for 'ZipCode'.")
        );
    }

    #[tokio::test]
    async fn translating_again_gives_the_same_sql() {
        let configuration = configuration("customers").await.unwrap();
        let comparison = QueryExpression::equal(
            billing_address(row(&configuration, "Customer")),
            QueryExpression::parameter("address", ClrType::structural("Address")),
        );

        let (first, second) = translate_twice(&configuration, &comparison).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn a_complex_value_is_null_when_all_its_members_are() {
        let configuration = configuration("customers").await.unwrap();
        let comparison = QueryExpression::equal(
            billing_address(row(&configuration, "Customer")),
            QueryExpression::null(ClrType::structural("Address")),
        );

        let translated = translate(&configuration, &comparison).unwrap();
        insta::assert_snapshot!(
            translated.sql.unwrap(),
            @"([c].[BillingAddress_Street] IS NULL AND [c].[BillingAddress_ZipCode] IS NULL)"
        );
    }

    #[tokio::test]
    async fn equals_on_entities_compares_by_key() {
        let configuration = configuration("customers").await.unwrap();
        let equals = QueryExpression::call(
            Some(row(&configuration, "Customer")),
            MethodInfo::new_instance(DeclaringType::Object, "Equals", ClrType::Boolean),
            vec![QueryExpression::parameter(
                "customer",
                ClrType::structural("Customer"),
            )],
        );

        let translated = translate(&configuration, &equals).unwrap();
        assert_eq!(
            translated.sql.as_deref(),
            Some("([c].[Id] = @entity_equality_customer_Id)")
        );
    }

    #[tokio::test]
    async fn contains_of_a_constant_entity_is_an_exists_by_key() {
        let configuration = configuration("customers").await.unwrap();
        let contains = QueryExpression::call(
            None,
            MethodInfo::new_static(DeclaringType::Queryable, "Contains", ClrType::Boolean),
            vec![
                QueryExpression::entity_query_root("Customer"),
                QueryExpression::constant(
                    serde_json::json!({ "Id": 7, "Name": "Ann" }),
                    ClrType::structural("Customer"),
                ),
            ],
        );

        let translated = translate(&configuration, &contains).unwrap();
        insta::assert_snapshot!(
            translated.sql.unwrap(),
            @"EXISTS (SELECT 1 FROM [Customers] AS [c] WHERE ([c].[Id] = 7))"
        );
    }

    #[tokio::test]
    async fn contains_over_a_query_root_is_an_exists() {
        let configuration = configuration("customers").await.unwrap();
        let contains = QueryExpression::call(
            None,
            MethodInfo::new_static(DeclaringType::Queryable, "Contains", ClrType::Boolean),
            vec![
                QueryExpression::entity_query_root("Customer"),
                QueryExpression::parameter("customer", ClrType::structural("Customer")),
            ],
        );

        let translated = translate(&configuration, &contains).unwrap();
        insta::assert_snapshot!(
            translated.sql.unwrap(),
            @"EXISTS (SELECT 1 FROM [Customers] AS [c] WHERE ([c].[Id] = @entity_equality_customer_Id))"
        );
    }
}

mod type_tests {
    use query_engine_metadata::metadata::ClrType;
    use query_engine_translation::translation::expression::{
        BinaryOperator, DeclaringType, MethodInfo, QueryExpression,
    };

    use super::common::{configuration, row, translate};

    fn get_type_equals(instance: QueryExpression, structural_type: &str) -> QueryExpression {
        QueryExpression::binary(
            BinaryOperator::Equal,
            QueryExpression::call(
                Some(instance),
                MethodInfo::new_instance(DeclaringType::Object, "GetType", ClrType::Type),
                vec![],
            ),
            QueryExpression::TypeConstant(ClrType::structural(structural_type)),
        )
    }

    #[tokio::test]
    async fn get_type_of_a_sealed_type_is_always_true() {
        let configuration = configuration("vehicles").await.unwrap();
        let test = get_type_equals(row(&configuration, "SportsCar"), "SportsCar");

        let translated = translate(&configuration, &test).unwrap();
        assert_eq!(translated.sql.as_deref(), Some("TRUE"));
    }

    #[tokio::test]
    async fn get_type_reads_the_discriminator() {
        let configuration = configuration("vehicles").await.unwrap();
        let test = get_type_equals(row(&configuration, "Vehicle"), "Car");

        let translated = translate(&configuration, &test).unwrap();
        insta::assert_snapshot!(translated.sql.unwrap(), @"([v].[Kind] = N'Car')");
    }

    #[tokio::test]
    async fn is_matches_every_concrete_derived_type() {
        let configuration = configuration("vehicles").await.unwrap();
        let test = QueryExpression::TypeIs {
            expression: Box::new(row(&configuration, "Vehicle")),
            type_operand: ClrType::structural("Car"),
        };

        let translated = translate(&configuration, &test).unwrap();
        insta::assert_snapshot!(
            translated.sql.unwrap(),
            @"[v].[Kind] IN (N'Car', N'SportsCar')"
        );
    }

    #[tokio::test]
    async fn types_outside_of_the_hierarchy_are_explained() {
        let configuration = configuration("vehicles").await.unwrap();
        let test = QueryExpression::TypeIs {
            expression: Box::new(row(&configuration, "Car")),
            type_operand: ClrType::structural("Truck"),
        };

        let translated = translate(&configuration, &test).unwrap();
        assert_eq!(translated.sql, None);
        assert!(translated
            .error_details
            .unwrap()
            .contains("'Truck' is not in the hierarchy of 'Car'"));
    }
}

mod methods {
    use query_engine_metadata::metadata::ClrType;
    use query_engine_translation::translation::expression::{
        DeclaringType, MethodInfo, QueryExpression,
    };

    use super::common::{configuration, translate};

    fn max(left: QueryExpression, right: QueryExpression) -> QueryExpression {
        QueryExpression::call(
            None,
            MethodInfo::new_static(DeclaringType::Math, "Max", ClrType::Int32),
            vec![left, right],
        )
    }

    fn int_parameter(name: &str) -> QueryExpression {
        QueryExpression::parameter(name, ClrType::Int32)
    }

    #[tokio::test]
    async fn nested_max_calls_become_one_greatest() {
        let configuration = configuration("customers").await.unwrap();
        let expression = max(
            max(int_parameter("a"), int_parameter("b")),
            max(int_parameter("c"), int_parameter("d")),
        );

        let translated = translate(&configuration, &expression).unwrap();
        insta::assert_snapshot!(translated.sql.unwrap(), @"GREATEST(@a, @b, @c, @d)");
    }

    #[tokio::test]
    async fn left_nested_max_calls_become_one_greatest() {
        let configuration = configuration("customers").await.unwrap();
        let expression = max(
            max(max(int_parameter("a"), int_parameter("b")), int_parameter("c")),
            int_parameter("d"),
        );

        let translated = translate(&configuration, &expression).unwrap();
        assert_eq!(translated.sql.as_deref(), Some("GREATEST(@a, @b, @c, @d)"));
    }

    #[tokio::test]
    async fn max_is_not_translated_without_greatest() {
        let configuration = configuration("no_greatest_least").await.unwrap();
        let expression = max(int_parameter("a"), int_parameter("b"));

        let translated = translate(&configuration, &expression).unwrap();
        assert_eq!(translated.sql, None);
    }

    #[tokio::test]
    async fn string_equals_with_a_comparison_is_explained() {
        let configuration = configuration("customers").await.unwrap();
        let expression = QueryExpression::call(
            None,
            MethodInfo::new_static(DeclaringType::String, "Equals", ClrType::Boolean),
            vec![
                QueryExpression::parameter("a", ClrType::String),
                QueryExpression::parameter("b", ClrType::String),
                QueryExpression::parameter("comparison", ClrType::Int32),
            ],
        );

        let translated = translate(&configuration, &expression).unwrap();
        assert_eq!(translated.sql, None);
        assert_eq!(
            translated.error_details.as_deref(),
            Some("Translation of the 'string.Equals' overload with a 'StringComparison' parameter is not supported.")
        );
    }
}

mod aggregates {
    use query_engine_metadata::metadata::ClrType;
    use query_engine_translation::translation::expression::{
        DeclaringType, MethodInfo, QueryExpression, UnaryOperator,
    };

    use super::common::{configuration, row, translate};

    fn queryable(name: &str, arguments: Vec<QueryExpression>, r#type: ClrType) -> QueryExpression {
        QueryExpression::call(
            None,
            MethodInfo::new_static(DeclaringType::Queryable, name, r#type),
            arguments,
        )
    }

    fn count(source: QueryExpression) -> QueryExpression {
        queryable("Count", vec![source], ClrType::Int32)
    }

    fn distinct(source: QueryExpression) -> QueryExpression {
        let r#type = source.r#type();
        queryable("Distinct", vec![source], r#type)
    }

    fn customers(configuration: &query_engine_configuration::Configuration) -> QueryExpression {
        QueryExpression::GroupByElement {
            element_selector: Box::new(row(configuration, "Customer")),
        }
    }

    fn names(source: QueryExpression) -> QueryExpression {
        let customer = ClrType::structural("Customer");
        let selector = QueryExpression::unary(
            UnaryOperator::Quote,
            QueryExpression::lambda(
                "x",
                customer.clone(),
                QueryExpression::member(
                    QueryExpression::lambda_parameter("x", customer),
                    "Name",
                    ClrType::String,
                ),
            ),
            ClrType::Object,
        );
        queryable("Select", vec![source, selector], ClrType::sequence(ClrType::String))
    }

    #[tokio::test]
    async fn distinct_entities_are_distinct_already() {
        let configuration = configuration("customers").await.unwrap();

        let plain = translate(&configuration, &count(customers(&configuration))).unwrap();
        let distinct = translate(&configuration, &count(distinct(customers(&configuration)))).unwrap();
        assert_eq!(plain.sql.as_deref(), Some("COUNT(*)"));
        assert_eq!(distinct.sql, plain.sql);
    }

    #[tokio::test]
    async fn distinct_is_idempotent() {
        let configuration = configuration("customers").await.unwrap();

        let once = translate(&configuration, &count(distinct(names(customers(&configuration))))).unwrap();
        let twice = translate(
            &configuration,
            &count(distinct(distinct(names(customers(&configuration))))),
        )
        .unwrap();
        insta::assert_snapshot!(once.sql.clone().unwrap(), @"COUNT(DISTINCT [c].[Name])");
        assert_eq!(twice.sql, once.sql);
    }

    fn lengths(source: QueryExpression) -> QueryExpression {
        let selector = QueryExpression::unary(
            UnaryOperator::Quote,
            QueryExpression::lambda(
                "n",
                ClrType::String,
                QueryExpression::member(
                    QueryExpression::lambda_parameter("n", ClrType::String),
                    "Length",
                    ClrType::Int32,
                ),
            ),
            ClrType::Object,
        );
        queryable("Select", vec![source, selector], ClrType::sequence(ClrType::Int32))
    }

    fn max(source: QueryExpression) -> QueryExpression {
        queryable("Max", vec![source], ClrType::String)
    }

    #[tokio::test]
    async fn selecting_from_distinct_entities_is_selecting_from_the_entities() {
        let configuration = configuration("customers").await.unwrap();

        let plain = translate(&configuration, &max(names(customers(&configuration)))).unwrap();
        let distinct =
            translate(&configuration, &max(names(distinct(customers(&configuration))))).unwrap();
        insta::assert_snapshot!(plain.sql.clone().unwrap(), @"MAX([c].[Name])");
        assert_eq!(distinct.sql, plain.sql);
    }

    #[tokio::test]
    async fn selecting_after_distinct_does_not_fold_into_the_aggregate() {
        let configuration = configuration("customers").await.unwrap();
        let expression = count(lengths(distinct(names(customers(&configuration)))));

        let translated = translate(&configuration, &expression).unwrap();
        assert_eq!(translated.sql, None);
    }
}
